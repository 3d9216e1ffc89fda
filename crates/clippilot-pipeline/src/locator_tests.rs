use super::*;
use crate::testing::FakePage;

fn css(selector: &'static str) -> Box<dyn LocateStrategy> {
    Box::new(CssStrategy::new(selector, Duration::ZERO))
}

#[tokio::test]
async fn test_css_hit_returns_node() {
    let page = FakePage::new();
    page.selectors.lock().unwrap().insert("[data-testid=\"split\"]".into(), 7);
    page.bounds.lock().unwrap().insert(7, Rect::new(0.0, 0.0, 40.0, 20.0));

    let resolver =
        Resolver::with_strategies(UiAction::SplitButton, vec![css("[data-testid=\"split\"]")]);
    let located = resolver.resolve(&page).await.unwrap();
    assert_eq!(located, Located::Node(7));
}

#[tokio::test]
async fn test_keyboard_fallback_after_six_structural_misses() {
    // All structural selectors fail; the keyboard shortcut must win and
    // the resolver must have tried every one of them first.
    let page = FakePage::new();
    let resolver = Resolver::with_strategies(
        UiAction::SplitButton,
        vec![
            css("[data-testid=\"split\"]"),
            css("[class*=\"toolbar\"] [class*=\"split\"]"),
            css("[class*=\"split-btn\"]"),
            css("button[title*=\"plit\"]"),
            css("[aria-label*=\"plit\"]"),
            css("[class*=\"icon-split\"]"),
            Box::new(KeyStrategy::new("s")),
        ],
    );

    let located = resolver.resolve(&page).await.unwrap();
    assert_eq!(located, Located::Key("s"));
    assert_eq!(page.wait_for_calls.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_hidden_node_falls_through_to_next_strategy() {
    // Present in the DOM but without layout: the CSS strategy must not
    // return it.
    let page = FakePage::new();
    page.selectors.lock().unwrap().insert("[data-testid=\"delete\"]".into(), 3);
    page.bounds.lock().unwrap().insert(3, Rect::new(0.0, 0.0, 0.0, 0.0));

    let resolver = Resolver::with_strategies(
        UiAction::DeleteButton,
        vec![css("[data-testid=\"delete\"]"), Box::new(KeyStrategy::new("Delete"))],
    );
    let located = resolver.resolve(&page).await.unwrap();
    assert_eq!(located, Located::Key("Delete"));
}

#[tokio::test]
async fn test_text_scan_returns_center_point() {
    let page = FakePage::new();
    page.text_hits
        .lock()
        .unwrap()
        .push((vec!["split".to_string()], Point::new(50.0, 60.0)));

    let resolver = Resolver::with_strategies(
        UiAction::SplitButton,
        vec![Box::new(TextScanStrategy::new(&["split"]))],
    );
    let located = resolver.resolve(&page).await.unwrap();
    assert_eq!(located, Located::Point(Point::new(50.0, 60.0)));
}

#[tokio::test]
async fn test_exhaustion_is_action_not_locatable() {
    let page = FakePage::new();
    let resolver = Resolver::with_strategies(
        UiAction::ExportButton,
        vec![css("[data-testid=\"export\"]"), css("button[title*=\"xport\"]")],
    );

    let err = resolver.resolve(&page).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ActionNotLocatable(UiAction::ExportButton)
    ));
}

#[tokio::test]
async fn test_cursor_scan_narrows_to_handle_edge() {
    // A resize cursor band from x=40 to x=60: the coarse grid lands
    // inside it and the linear probe must walk out to the exact edge.
    let page = FakePage::new();
    *page.resize_band.lock().unwrap() = Some(Rect::new(40.0, 0.0, 20.0, 20.0));

    let strategy = CursorScanStrategy::new(
        Rect::new(0.0, 0.0, 100.0, 20.0),
        &["col-resize", "ew-resize"],
        8.0,
        Duration::ZERO,
    );
    let located = strategy.locate(&page).await.unwrap().unwrap();
    assert_eq!(located, Located::Point(Point::new(60.0, 0.0)));
}

#[tokio::test]
async fn test_cursor_scan_misses_without_band() {
    let page = FakePage::new();
    let strategy = CursorScanStrategy::new(
        Rect::new(0.0, 0.0, 50.0, 10.0),
        &["col-resize"],
        10.0,
        Duration::ZERO,
    );
    assert!(strategy.locate(&page).await.unwrap().is_none());
}

#[tokio::test]
async fn test_builtin_split_resolver_ends_with_keyboard() {
    // The built-in table must keep the shortcut as the terminal
    // fallback so a fully restyled toolbar still splits.
    let cfg = PipelineConfig::default();
    let page = FakePage::new();
    let located = Resolver::for_action(UiAction::SplitButton, &cfg)
        .resolve(&page)
        .await
        .unwrap();
    assert_eq!(located, Located::Key("s"));
}
