//! Integration tests for the click → extract → format → upsert → toast flow.

use std::sync::Arc;
use std::time::{Duration, Instant};

use blinko_clipper::extractor::is_post_container;
use blinko_clipper::toast::{ToastKind, TOAST_DURATION};
use blinko_clipper::{
    BackgroundWorker, BlinkoClient, ClipError, ContentScript, Document, MemorySettingsStore,
    MessageSender, PostExtractor, Settings, SettingsStore,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_URL: &str = "https://x.com/home";

/// A timeline page with one post that has body text and no photos.
const TIMELINE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
<main id="feed">
<article data-testid="tweet">
  <div data-testid="Tweet-User-Avatar"><a href="/jane"><img src="https://pbs.twimg.com/profile/jane.jpg"></a></div>
  <div data-testid="User-Name"><div><span>Jane Doe</span></div><div><div><a href="/jane"><span>@jane</span></a></div><div><span>·</span></div><div><a href="/jane/status/42"><time datetime="2024-04-30T12:00:00.000Z">Apr 30</time></a></div></div></div>
  <div data-testid="tweetText"><span>Hello
world</span></div>
  <div role="group"><div class="r-reply"><button data-testid="reply"></button></div><div class="r-bookmark"><button data-testid="bookmark"></button></div></div>
</article>
</main>
</body>
</html>"#;

const EXPECTED_NOTE: &str = "> ![](https://pbs.twimg.com/profile/jane.jpg) **Jane Doe** `@jane`\n\
                             >\n\
                             > Hello\n\
                             > world\n\
                             >\n\
                             > *Apr 30* · [View Tweet](https://x.com/jane/status/42)";

fn worker() -> MessageSender {
    BackgroundWorker::spawn(BlinkoClient::new(1).expect("Failed to build client"))
}

fn script_with(settings: Settings) -> ContentScript {
    let store: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new(settings));
    ContentScript::start(
        Document::parse(TIMELINE_PAGE, PAGE_URL),
        PostExtractor::default(),
        store,
        worker(),
    )
}

#[tokio::test]
async fn test_client_strips_slash_and_sends_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/note/upsert"))
        .and(header("Authorization", "Bearer abc"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "content": "> note",
            "type": 1,
            "attachments": [],
            "references": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlinkoClient::new(1).unwrap();
    let result = client
        .save("> note", &format!("{}/", server.uri()), "abc")
        .await;

    assert!(result.success);
    assert_eq!(result.data, Some(json!({"id": 5})));
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_client_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/note/upsert"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlinkoClient::new(1).unwrap();
    let result = client.save("> note", &server.uri(), "wrong").await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("API Error: 401 Unauthorized"));
}

#[tokio::test]
async fn test_client_non_json_success_body_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/note/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = BlinkoClient::new(1).unwrap();
    let result = client.save("> note", &server.uri(), "abc").await;

    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_client_uses_configured_note_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "content": "x",
            "type": -1,
            "attachments": [],
            "references": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlinkoClient::new(-1).unwrap();
    assert!(client.save("x", &server.uri(), "abc").await.success);
}

#[tokio::test]
async fn test_start_injects_one_control_per_post() {
    let script = script_with(Settings::default());
    let posts = script.document().query_all(is_post_container);
    assert_eq!(posts.len(), 1);
    assert_eq!(script.triggers().len(), 1);
}

#[tokio::test]
async fn test_click_saves_formatted_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/note/upsert"))
        .and(header("Authorization", "Bearer abc"))
        .and(body_json(json!({
            "content": EXPECTED_NOTE,
            "type": 1,
            "attachments": [],
            "references": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let script = script_with(Settings::new(server.uri(), "abc"));
    let trigger = script.triggers().remove(0);
    let result = script.click(&trigger).await.unwrap();

    assert!(result.success);
    assert_eq!(result.data, Some(json!({"id": 5})));
    assert_eq!(script.toast().text().as_deref(), Some("Saved to Blinko!"));
    assert_eq!(script.toast().kind(), Some(ToastKind::Success));
    assert!(script.toast().is_visible());
}

#[tokio::test]
async fn test_click_unauthorized_shows_error_toast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let script = script_with(Settings::new(server.uri(), "abc"));
    let trigger = script.triggers().remove(0);
    let result = script.click(&trigger).await.unwrap();

    assert!(!result.success);
    assert_eq!(
        script.toast().text().as_deref(),
        Some("Failed to save to Blinko: API Error: 401 Unauthorized")
    );
    assert_eq!(script.toast().kind(), Some(ToastKind::Error));
}

#[tokio::test]
async fn test_click_without_settings_alerts_and_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let script = script_with(Settings::new(server.uri(), ""));
    let trigger = script.triggers().remove(0);
    let error = script.click(&trigger).await.unwrap_err();

    assert!(matches!(error, ClipError::MissingSettings));
    assert_eq!(
        script.alerts(),
        ["Blinko settings not found. Please configure the extension.".to_string()]
    );
    assert!(script.toast().text().is_none());
}

#[tokio::test]
async fn test_click_network_failure_shows_underlying_message() {
    // Nothing listens on the discard port
    let script = script_with(Settings::new("http://127.0.0.1:9", "abc"));
    let trigger = script.triggers().remove(0);
    let result = script.click(&trigger).await.unwrap();

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(!error.is_empty());
    assert_eq!(
        script.toast().text(),
        Some(format!("Failed to save to Blinko: {error}"))
    );
}

#[tokio::test]
async fn test_repeated_clicks_are_independent_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(2)
        .mount(&server)
        .await;

    let script = script_with(Settings::new(server.uri(), "abc"));
    let trigger = script.triggers().remove(0);
    assert!(script.click(&trigger).await.unwrap().success);
    assert!(script.click(&trigger).await.unwrap().success);
}

#[tokio::test]
async fn test_overlapping_clicks_each_send_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/note/upsert"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let script = script_with(Settings::new(server.uri(), "abc"));
    let trigger = script.triggers().remove(0);
    let (first, second) = tokio::join!(script.click(&trigger), script.click(&trigger));

    assert!(first.unwrap().success);
    assert!(second.unwrap().success);
    assert_eq!(script.toast().text().as_deref(), Some("Saved to Blinko!"));
}

#[tokio::test]
async fn test_toast_hides_three_seconds_after_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let script = script_with(Settings::new(server.uri(), "abc"));
    let trigger = script.triggers().remove(0);
    script.click(&trigger).await.unwrap();
    let replied_at = Instant::now();

    script.tick(replied_at);
    assert!(script.toast().is_visible());

    script.tick(replied_at + TOAST_DURATION + Duration::from_millis(10));
    assert!(!script.toast().is_visible());
    assert_eq!(script.toast().text().as_deref(), Some("Saved to Blinko!"));
}

#[tokio::test]
async fn test_scrolled_in_posts_get_controls() {
    let mut script = script_with(Settings::default());
    let feed = script
        .document()
        .query_first(|n| blinko_clipper::dom::attr(n, "id").as_deref() == Some("feed"))
        .unwrap();

    let article = TIMELINE_PAGE
        .split("<main id=\"feed\">")
        .nth(1)
        .and_then(|rest| rest.split("</main>").next())
        .unwrap();
    script.document().append_html(&feed, article);
    script.process_mutations();
    script.process_mutations();

    assert_eq!(script.document().query_all(is_post_container).len(), 2);
    assert_eq!(script.triggers().len(), 2);
}

#[tokio::test]
async fn test_settings_saved_from_form_apply_to_next_click() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(blinko_clipper::FileSettingsStore::new(
        dir.path().join("settings.json"),
    ));
    let script = ContentScript::start(
        Document::parse(TIMELINE_PAGE, PAGE_URL),
        PostExtractor::default(),
        store.clone(),
        worker(),
    );
    let trigger = script.triggers().remove(0);

    assert!(matches!(
        script.click(&trigger).await,
        Err(ClipError::MissingSettings)
    ));

    let mut form = blinko_clipper::SettingsForm::load(&*store).unwrap();
    form.base_url = format!("{}/", server.uri());
    form.token = " abc ".to_string();
    assert!(form.save(&*store, Instant::now()).unwrap());

    let result = script.click(&trigger).await.unwrap();
    assert!(result.success);
    assert_eq!(result.data, Some(json!({"id": 9})));
}
