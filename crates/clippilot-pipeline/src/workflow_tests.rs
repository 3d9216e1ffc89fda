use super::*;
use crate::progress::TracingProgressSink;
use crate::testing::{CollectingStatusSink, FakePage};
use tempfile::TempDir;

const CANVAS: Rect = Rect {
    x: 0.0,
    y: 400.0,
    width: 1200.0,
    height: 300.0,
};

fn test_config(tmp: &TempDir) -> PipelineConfig {
    PipelineConfig {
        cursor_scan_step_px: 16.0,
        cursor_probe_delay_ms: 0,
        debug_dir: tmp.path().join("debug"),
        ..PipelineConfig::default()
    }
}

/// Spawn a task that drops the finished export into `dir` after a
/// virtual delay, the way the browser would.
fn spawn_download_writer(dir: std::path::PathBuf, delay_secs: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(delay_secs)).await;
        tokio::fs::write(dir.join("my_clip.mp4"), b"rendered output")
            .await
            .unwrap();
    });
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_runs_all_stages() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    // Resize cursor band [1150, 1160]: the clip is 1160px wide, which
    // already covers the 900px target, so trim must not drag.
    let page = FakePage::happy(CANVAS, Rect::new(1150.0, 480.0, 10.0, 40.0));
    let job = Job::new("/videos/clip.mp4", 30.0);
    let progress = TracingProgressSink;
    let status = CollectingStatusSink::default();

    spawn_download_writer(tmp.path().to_path_buf(), 30);

    let workflow = Workflow::new(&page, &cfg, &job, &progress, &status, tmp.path());
    let (output, records) = workflow.run().await.unwrap();

    assert_eq!(output.file_name().unwrap(), "my_clip.mp4");
    assert_eq!(records.len(), Stage::ALL.len());
    assert_eq!(records[0].stage, Stage::Upload);
    assert_eq!(records.last().unwrap().stage, Stage::WaitDownloadReady);

    // The input file was attached to the upload input.
    let attached = page.attached.lock().unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].1, std::path::PathBuf::from("/videos/clip.mp4"));
    drop(attached);

    // The only drag is the clip positioning; the clip already covered
    // the target width so no trim drag happened.
    assert_eq!(page.drags.lock().unwrap().len(), 1);

    // Playhead reset went through the keyboard.
    assert!(page.keys.lock().unwrap().iter().any(|k| k == "Home"));

    // Effect completion was reported to the catalog mid-run.
    let updates = status.updates.lock().unwrap();
    assert_eq!(updates.as_slice(), &[("clip".to_string(), VideoStatus::EffectApplied)]);
}

#[tokio::test(start_paused = true)]
async fn test_short_clip_is_stretched_before_split() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    // Band [592, 600]: the clip is 600px wide, 300px short of target.
    let page = FakePage::happy(CANVAS, Rect::new(592.0, 480.0, 8.0, 40.0));
    let job = Job::new("/videos/clip.mp4", 30.0);
    let progress = TracingProgressSink;
    let status = CollectingStatusSink::default();

    spawn_download_writer(tmp.path().to_path_buf(), 30);

    let workflow = Workflow::new(&page, &cfg, &job, &progress, &status, tmp.path());
    workflow.run().await.unwrap();

    let drags = page.drags.lock().unwrap();
    assert_eq!(drags.len(), 2, "positioning drag plus trim drag");
    let (from, to, steps) = drags[1];
    assert_eq!(from.x, 600.0);
    assert_eq!(to.x, 900.0);
    assert_eq!(to.y, from.y);
    assert_eq!(steps, cfg.drag_steps);
}

#[tokio::test(start_paused = true)]
async fn test_rename_uses_item_name() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let page = FakePage::happy(CANVAS, Rect::new(1150.0, 480.0, 10.0, 40.0));
    let job = Job::new("/videos/Holiday Reel.mp4", 30.0);
    let progress = TracingProgressSink;
    let status = CollectingStatusSink::default();

    spawn_download_writer(tmp.path().to_path_buf(), 30);

    let workflow = Workflow::new(&page, &cfg, &job, &progress, &status, tmp.path());
    workflow.run().await.unwrap();

    let set_values = page.set_values.lock().unwrap();
    assert!(
        set_values.iter().any(|(_, v)| v == "Holiday Reel"),
        "project rename must use the item name: {set_values:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_unlocatable_action_fails_stage_with_tag() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    // Nothing resolves on an empty page: the very first stage fails.
    let page = FakePage::new();
    let job = Job::new("/videos/clip.mp4", 30.0);
    let progress = TracingProgressSink;
    let status = CollectingStatusSink::default();

    let workflow = Workflow::new(&page, &cfg, &job, &progress, &status, tmp.path());
    let failure = workflow.run().await.unwrap_err();

    assert_eq!(failure.stage, Stage::Upload);
    assert!(matches!(
        failure.source,
        PipelineError::ActionNotLocatable(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_download_name_falls_back_to_link_attribute() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let page = FakePage::happy(CANVAS, Rect::new(1150.0, 480.0, 10.0, 40.0));
    // No dialog field value: the link's download attribute is next in
    // the priority order.
    page.input_values.lock().unwrap().clear();
    page.attributes
        .lock()
        .unwrap()
        .insert((1, "download".to_string()), "my_clip.mp4".to_string());
    let job = Job::new("/videos/clip.mp4", 30.0);
    let progress = TracingProgressSink;
    let status = CollectingStatusSink::default();

    spawn_download_writer(tmp.path().to_path_buf(), 30);

    let workflow = Workflow::new(&page, &cfg, &job, &progress, &status, tmp.path());
    let (output, _) = workflow.run().await.unwrap();
    assert_eq!(output.file_name().unwrap(), "my_clip.mp4");
}
