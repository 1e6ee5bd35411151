use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chitieu_bot::adapters::MemoryStore;
use chitieu_bot::domain::StoredRow;
use chitieu_bot::handlers::webhook::{sign, SIGNATURE_HEADER};
use chitieu_bot::middleware::RequestLogConfig;
use chitieu_bot::ports::{NotifyError, Notifier};
use chitieu_bot::services::MessageRouter;
use chitieu_bot::{create_app, AppState};
use chrono::FixedOffset;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

const SECRET: &str = "webhook-secret";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, owner_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().await.push((owner_id.to_string(), text.to_string()));
        Ok(())
    }
}

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn test_app(secret: Option<&str>) -> TestApp {
    let store = Arc::new(MemoryStore::with_default_categories());
    let notifier = Arc::new(RecordingNotifier::default());
    let router = MessageRouter::new(
        store.clone(),
        store.clone(),
        notifier.clone(),
        FixedOffset::east_opt(7 * 3600).unwrap(),
    )
    .unwrap();

    let state = AppState {
        router: Arc::new(router),
        webhook_secret: secret.map(str::to_string),
    };

    TestApp {
        app: create_app(state, RequestLogConfig { log_body: true }),
        store,
        notifier,
    }
}

fn text_event(owner: &str, text: &str) -> String {
    json!({
        "event_name": "message.text.received",
        "message": { "text": text, "from": { "id": owner }, "chat": { "id": owner } }
    })
    .to_string()
}

fn post(uri: &str, body: String, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_signed_transaction_is_recorded_and_replied() {
    let t = test_app(Some(SECRET));
    let body = text_event("u1", "Chi 50k ăn uống");
    let signature = sign(SECRET, body.as_bytes()).unwrap();

    let response = t.app.oneshot(post("/webhook", body, Some(signature))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));

    let rows = t.store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "Chi");
    assert_eq!(rows[0].amount, "50000");
    assert_eq!(rows[0].category, "Ăn uống");
    assert_eq!(rows[0].owner_id, "u1");

    let sent = t.notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "u1");
    assert!(sent[0].1.contains("50,000"));
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let t = test_app(Some(SECRET));
    let body = text_event("u1", "Chi 50k ăn uống");
    let signature = sign("wrong-secret", body.as_bytes()).unwrap();

    let response = t.app.oneshot(post("/webhook", body, Some(signature))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["status"], 401);
    assert!(t.store.rows().await.is_empty());
    assert!(t.notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_missing_signature_rejected() {
    let t = test_app(Some(SECRET));

    let response = t
        .app
        .oneshot(post("/api/webhook", text_event("u1", "Chi 50k ăn uống"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsigned_accepted_without_secret() {
    let t = test_app(None);

    let response = t
        .app
        .oneshot(post("/", text_event("u2", "Thu 5 triệu lương"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rows = t.store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "Thu");
    assert_eq!(rows[0].amount, "5000000");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let t = test_app(None);

    let response = t
        .app
        .oneshot(post("/webhook", "{not json".to_string(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_events_ignored() {
    let t = test_app(None);
    let body = json!({
        "event_name": "user_send_sticker",
        "sender": { "id": "u1" },
        "message": { "text": "Chi 50k ăn uống" }
    })
    .to_string();

    let response = t.app.oneshot(post("/webhook", body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.store.rows().await.is_empty());
    assert!(t.notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_statistics_request_replies_with_totals() {
    let t = test_app(None);
    t.store
        .push_row(StoredRow {
            timestamp: "2024-03-02 08:00:00".to_string(),
            kind: "Thu".to_string(),
            amount: "5000000".to_string(),
            category: "Lương".to_string(),
            note: String::new(),
            owner_id: "u1".to_string(),
        })
        .await;
    t.store
        .push_row(StoredRow {
            timestamp: "2024-03-05 12:30:00".to_string(),
            kind: "Chi".to_string(),
            amount: "50000".to_string(),
            category: "Ăn uống".to_string(),
            note: "trưa".to_string(),
            owner_id: "u1".to_string(),
        })
        .await;
    t.store
        .push_row(StoredRow {
            timestamp: "2024-03-06 12:30:00".to_string(),
            kind: "Chi".to_string(),
            amount: "999999".to_string(),
            category: "Mua sắm".to_string(),
            note: String::new(),
            owner_id: "someone-else".to_string(),
        })
        .await;

    let body = json!({
        "event": "user_send_text",
        "sender": { "id": "u1" },
        "message": { "text": "thống kê tháng 3 năm 2024" }
    })
    .to_string();

    let response = t.app.oneshot(post("/webhook", body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = t.notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    let reply = &sent[0].1;
    assert!(reply.contains("3/2024"));
    assert!(reply.contains("5,000,000"));
    assert!(reply.contains("4,950,000"));
    assert!(!reply.contains("999,999"));
}

#[tokio::test]
async fn test_health_and_index() {
    let t = test_app(None);

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");

    let response = t
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["service"], "chitieu-bot");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let t = test_app(None);
    let body = "x".repeat(chitieu_bot::MAX_BODY_BYTES + 1);

    let response = t.app.oneshot(post("/webhook", body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
