use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Page.navigate".to_string(),
        params: Some(serde_json::json!({"url": "https://editor.example.com"})),
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("Page.navigate"));
    assert!(json.contains("editor.example.com"));
    assert!(!json.contains("sessionId"));
}

#[test]
fn test_cdp_request_serialize_with_session() {
    let req = CdpRequest {
        id: 7,
        method: "DOM.querySelector".to_string(),
        params: None,
        session_id: Some("sess-1".to_string()),
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("\"sessionId\":\"sess-1\""));
    assert!(!json.contains("params"));
}

#[test]
fn test_cdp_response_deserialize() {
    let json = r#"{"id": 1, "result": {"frameId": "abc"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.result.is_some());
    assert!(resp.error.is_none());
}

#[test]
fn test_cdp_event_deserialize() {
    let json = r#"{"method": "Page.loadEventFired", "params": {}, "sessionId": "s"}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, None);
    assert_eq!(resp.method.as_deref(), Some("Page.loadEventFired"));
    assert_eq!(resp.session_id.as_deref(), Some("s"));
}

#[test]
fn test_page_info_deserialize() {
    let json = r#"{
        "id": "page123",
        "type": "page",
        "title": "Editor",
        "url": "https://editor.example.com/session/abc",
        "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/page123"
    }"#;
    let info: PageInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.id, "page123");
    assert_eq!(info.page_type, "page");
}

#[test]
fn test_box_model_deserialize() {
    let json = r#"{
        "content": [0.0, 0.0, 10.0, 0.0, 10.0, 4.0, 0.0, 4.0],
        "padding": [0.0, 0.0, 10.0, 0.0, 10.0, 4.0, 0.0, 4.0],
        "border": [0.0, 0.0, 10.0, 0.0, 10.0, 4.0, 0.0, 4.0],
        "margin": [0.0, 0.0, 10.0, 0.0, 10.0, 4.0, 0.0, 4.0],
        "width": 10,
        "height": 4
    }"#;
    let model: BoxModel = serde_json::from_str(json).unwrap();
    assert_eq!(model.width, 10);
    assert_eq!(model.content.len(), 8);
}

#[test]
fn test_mouse_button_serialize() {
    let btn = MouseButton::Left;
    let json = serde_json::to_string(&btn).unwrap();
    assert_eq!(json, "\"left\"");
}

#[test]
fn test_screenshot_format_serialize() {
    let fmt = ScreenshotFormat::Png;
    let json = serde_json::to_string(&fmt).unwrap();
    assert_eq!(json, "\"png\"");
}
