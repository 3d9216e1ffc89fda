use super::*;
use std::sync::atomic::Ordering;

use tempfile::TempDir;

use clippilot_registry::{Editor, EditorRegistry, MemoryRegistryStore};

use crate::config::PipelineConfig;
use crate::geometry::Rect;
use crate::progress::TracingProgressSink;
use crate::stage::Stage;
use crate::testing::{CollectingStatusSink, FakePage, FakeProvider};

const CANVAS: Rect = Rect {
    x: 0.0,
    y: 400.0,
    width: 1200.0,
    height: 300.0,
};

struct Fixture {
    registry: Arc<EditorRegistry>,
    provider: Arc<FakeProvider>,
    status: Arc<CollectingStatusSink>,
    driver: JobDriver,
    tmp: TempDir,
}

fn fixture(editors: &[&str], page: FakePage) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(EditorRegistry::new(Arc::new(
        MemoryRegistryStore::with_editors(editors.iter().map(|u| Editor::new(*u)).collect()),
    )));
    let provider = Arc::new(FakeProvider::new(
        Arc::new(page),
        tmp.path().join("downloads"),
    ));
    std::fs::create_dir_all(tmp.path().join("downloads")).unwrap();
    let status = Arc::new(CollectingStatusSink::default());

    let config = PipelineConfig {
        cursor_scan_step_px: 16.0,
        cursor_probe_delay_ms: 0,
        debug_dir: tmp.path().join("debug"),
        ..PipelineConfig::default()
    };

    let driver = JobDriver::new(
        registry.clone(),
        provider.clone(),
        config,
        Arc::new(TracingProgressSink),
        status.clone(),
    );

    Fixture {
        registry,
        provider,
        status,
        driver,
        tmp,
    }
}

/// A job whose input file actually exists.
fn job_with_input(tmp: &TempDir) -> Job {
    let input = tmp.path().join("clip.mp4");
    std::fs::write(&input, b"source video").unwrap();
    Job::new(input, 30.0)
}

fn statuses(fx: &Fixture) -> Vec<VideoStatus> {
    fx.status
        .updates
        .lock()
        .unwrap()
        .iter()
        .map(|(_, s)| *s)
        .collect()
}

#[tokio::test]
async fn test_empty_pool_fails_fast_without_browser_interaction() {
    let fx = fixture(&[], FakePage::new());
    let job = job_with_input(&fx.tmp);

    let err = fx.driver.run(&job).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoResourceAvailable));

    // No page was opened, no navigation happened, no status was set.
    assert_eq!(fx.provider.opens.load(Ordering::SeqCst), 0);
    assert!(statuses(&fx).is_empty());
}

#[tokio::test]
async fn test_missing_input_fails_before_admission() {
    let fx = fixture(&["https://e/1"], FakePage::new());
    let job = Job::new(fx.tmp.path().join("nope.mp4"), 30.0);

    let err = fx.driver.run(&job).await.unwrap_err();
    assert!(matches!(err, PipelineError::VideoFileNotFound(_)));

    assert_eq!(fx.provider.opens.load(Ordering::SeqCst), 0);
    assert_eq!(fx.registry.list_available().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_navigation_failure_releases_editor() {
    let mut page = FakePage::new();
    page.fail_navigation = true;
    let fx = fixture(&["https://e/1"], page);
    let job = job_with_input(&fx.tmp);

    let err = fx.driver.run(&job).await.unwrap_err();
    assert!(matches!(err, PipelineError::NavigationFailed { .. }));

    // The lease came back, the page was closed, a screenshot landed in
    // the debug dir, and the catalog saw processing then failed.
    assert_eq!(fx.registry.list_available().await.unwrap().len(), 1);
    assert_eq!(fx.provider.closes.load(Ordering::SeqCst), 1);
    let snapshot = fx.tmp.path().join("debug").join(format!("{}-navigation.jpg", job.id));
    assert!(snapshot.exists());
    assert_eq!(statuses(&fx), vec![VideoStatus::Processing, VideoStatus::Failed]);
}

#[tokio::test]
async fn test_stage_failure_before_export_is_plain_failed() {
    // An empty page resolves nothing, so the upload stage fails.
    let fx = fixture(&["https://e/1"], FakePage::new());
    let job = job_with_input(&fx.tmp);

    let err = fx.driver.run(&job).await.unwrap_err();
    match err {
        PipelineError::StageFailed(failure) => {
            assert_eq!(failure.stage, Stage::Upload);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(fx.registry.list_available().await.unwrap().len(), 1);
    assert_eq!(statuses(&fx), vec![VideoStatus::Processing, VideoStatus::Failed]);
    let snapshot = fx.tmp.path().join("debug").join(format!("{}-upload.jpg", job.id));
    assert!(snapshot.exists());
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_export_request_is_export_failed() {
    // The full pipeline runs but no download ever lands: the final wait
    // times out, and because the failure is past the export request it
    // is classified export-failed.
    let page = FakePage::happy(CANVAS, Rect::new(1150.0, 480.0, 10.0, 40.0));
    let fx = fixture(&["https://e/1"], page);
    let job = job_with_input(&fx.tmp);

    let err = fx.driver.run(&job).await.unwrap_err();
    match err {
        PipelineError::StageFailed(failure) => {
            assert_eq!(failure.stage, Stage::WaitDownloadReady);
            assert!(matches!(failure.source, PipelineError::DownloadNotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(fx.registry.list_available().await.unwrap().len(), 1);
    assert_eq!(
        statuses(&fx),
        vec![
            VideoStatus::Processing,
            VideoStatus::EffectApplied,
            VideoStatus::ExportFailed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_leak_freedom_and_report() {
    let page = FakePage::happy(CANVAS, Rect::new(1150.0, 480.0, 10.0, 40.0));
    let fx = fixture(&["https://e/1", "https://e/2"], page);
    let job = job_with_input(&fx.tmp);

    // The browser drops the rendered file in after a while.
    let download_dir = fx.provider.download_dir.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        tokio::fs::write(download_dir.join("my_clip.mp4"), b"rendered")
            .await
            .unwrap();
    });

    let report = fx.driver.run(&job).await.unwrap();

    assert_eq!(report.job_id, job.id);
    assert_eq!(report.output.file_name().unwrap(), "my_clip.mp4");
    assert_eq!(report.stages.len(), Stage::ALL.len());

    // Both editors available again; exactly one open/close pair.
    assert_eq!(fx.registry.list_available().await.unwrap().len(), 2);
    assert_eq!(fx.provider.opens.load(Ordering::SeqCst), 1);
    assert_eq!(fx.provider.closes.load(Ordering::SeqCst), 1);

    assert_eq!(
        statuses(&fx),
        vec![
            VideoStatus::Processing,
            VideoStatus::EffectApplied,
            VideoStatus::Exported
        ]
    );

    // The page navigated to the leased editor's URL.
    let navigations = fx.provider.page.navigations.lock().unwrap();
    assert_eq!(navigations.as_slice(), ["https://e/1"]);
}

#[tokio::test]
async fn test_first_available_editor_is_chosen_in_order() {
    let mut page = FakePage::new();
    page.fail_navigation = true;
    let fx = fixture(&["https://e/1", "https://e/2"], page);

    // Lease the first editor out of band; admission must take the next.
    let lease = fx.registry.clone().lease("https://e/1").await.unwrap();
    let job = job_with_input(&fx.tmp);
    let _ = fx.driver.run(&job).await;

    let navigations = fx.provider.page.navigations.lock().unwrap();
    assert_eq!(navigations.as_slice(), ["https://e/2"]);
    drop(navigations);

    lease.release().await.unwrap();
}
