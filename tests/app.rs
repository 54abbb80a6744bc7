use async_trait::async_trait;
use axum::Router;
use mailstash::{
    app::AppState,
    error::{MailError, Result},
    http,
    models::email::{DbEmail, NewEmail},
    service::MailService,
    store::{MessageFilter, SqliteStore, Store},
};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;

async fn serve_with(store: Arc<dyn Store>) -> (String, JoinHandle<()>) {
    let state = AppState {
        mail: MailService::new(store),
    };
    let app: Router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

async fn start_server() -> (String, Arc<SqliteStore>, JoinHandle<()>) {
    let store = Arc::new(SqliteStore::in_memory().await.expect("memory sqlite"));
    let (base, handle) = serve_with(store.clone()).await;
    (base, store, handle)
}

fn backend_down() -> MailError {
    MailError::Persistence(sqlx::Error::PoolClosed)
}

/// Every call fails as if the database had gone away.
struct Unavailable;

#[async_trait]
impl Store for Unavailable {
    async fn insert(&self, _email: NewEmail) -> Result<i64> {
        Err(backend_down())
    }

    async fn find_by_id(&self, _id: i64) -> Result<DbEmail> {
        Err(backend_down())
    }

    async fn list(&self, _filter: &MessageFilter) -> Result<Vec<DbEmail>> {
        Err(backend_down())
    }

    async fn update_is_read(&self, _id: i64, _value: bool) -> Result<()> {
        Err(backend_down())
    }
}

/// Reads work; flipping the read flag fails.
struct ReadFlagFails(SqliteStore);

#[async_trait]
impl Store for ReadFlagFails {
    async fn insert(&self, email: NewEmail) -> Result<i64> {
        self.0.insert(email).await
    }

    async fn find_by_id(&self, id: i64) -> Result<DbEmail> {
        self.0.find_by_id(id).await
    }

    async fn list(&self, filter: &MessageFilter) -> Result<Vec<DbEmail>> {
        self.0.list(filter).await
    }

    async fn update_is_read(&self, _id: i64, _value: bool) -> Result<()> {
        Err(backend_down())
    }
}

async fn assert_json_error(res: reqwest::Response, status: reqwest::StatusCode) {
    assert_eq!(res.status(), status);
    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");
    let v: serde_json::Value = res.json().await.unwrap();
    assert!(!v["error"].as_str().unwrap().is_empty());
}

async fn submit(client: &reqwest::Client, base: &str, payload: serde_json::Value) -> i64 {
    let res = client
        .post(format!("{}/send-email", base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let v: serde_json::Value = res.json().await.unwrap();
    assert_eq!(v["message"], "Email sent successfully");
    v["id"].as_i64().unwrap()
}

#[tokio::test]
async fn send_then_fetch_marks_read() {
    let (base, _store, _srv) = start_server().await;
    let client = reqwest::Client::new();

    let id = submit(
        &client,
        &base,
        json!({
            "from": "dev@example.test",
            "to": "you@example.test",
            "subject": "Hello JSON",
            "body": "Hi",
        }),
    )
    .await;

    // Listed as unread first
    let res = client.get(format!("{}/emails", base)).send().await.unwrap();
    assert!(res.status().is_success());
    let arr: serde_json::Value = res.json().await.unwrap();
    let listed = arr
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["id"].as_i64() == Some(id))
        .unwrap()
        .clone();
    assert_eq!(listed["isRead"], false);

    // Fetch one
    let res = client
        .get(format!("{}/email/{}", base, id))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let m: serde_json::Value = res.json().await.unwrap();
    assert_eq!(m["from"], "dev@example.test");
    assert_eq!(m["to"], "you@example.test");
    assert_eq!(m["subject"], "Hello JSON");
    assert_eq!(m["body"], "Hi");
    assert_eq!(m["isRead"], true);
    assert!(m["timestamp"].is_string());

    // A second fetch still succeeds and stays read
    let res = client
        .get(format!("{}/email/{}", base, id))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let m: serde_json::Value = res.json().await.unwrap();
    assert_eq!(m["isRead"], true);
}

#[tokio::test]
async fn missing_email_is_404() {
    let (base, _store, _srv) = start_server().await;
    let res = reqwest::get(format!("{}/email/999", base)).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let v: serde_json::Value = res.json().await.unwrap();
    assert!(v["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn mark_read_endpoint_is_idempotent_and_silent_for_unknown_ids() {
    let (base, store, _srv) = start_server().await;
    let client = reqwest::Client::new();
    let id = submit(
        &client,
        &base,
        json!({ "from": "a@example.test", "to": "b@example.test" }),
    )
    .await;

    for _ in 0..2 {
        let res = client
            .post(format!("{}/email/{}/read", base, id))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        let v: serde_json::Value = res.json().await.unwrap();
        assert_eq!(v["message"], "Email marked as read");
    }
    assert!(store.find_by_id(id).await.unwrap().is_read);

    let res = client
        .post(format!("{}/email/4242/read", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn malformed_submission_is_400() {
    let (base, store, _srv) = start_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/send-email", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/send-email", base))
        .json(&json!({ "subject": "no addresses" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/send-email", base))
        .json(&json!({ "from": "a@example.test", "to": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let all = store
        .list(&MessageFilter::All)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn list_honors_a_single_filter_with_precedence() {
    let (base, store, _srv) = start_server().await;
    let client = reqwest::Client::new();

    let now = chrono::Utc::now();
    let rows = [
        ("alice@example.test", "bob@example.test", "Alpha One", 3),
        ("carol@example.test", "alice@example.test", "Beta Two", 2),
        ("alice@example.test", "dave@example.test", "Gamma", 1),
    ];
    for (from, to, subject, minutes_ago) in rows {
        store
            .insert(NewEmail {
                from_address: from.into(),
                to_address: to.into(),
                subject: subject.into(),
                body: "x".into(),
                received_at: now - chrono::Duration::minutes(minutes_ago),
                attachments: None,
            })
            .await
            .unwrap();
    }

    let subjects = |v: serde_json::Value| -> Vec<String> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|m| m["subject"].as_str().unwrap().to_string())
            .collect()
    };

    // Sender filter, newest first
    let res = client
        .get(format!("{}/emails?from=ALICE", base))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert_eq!(subjects(res.json().await.unwrap()), ["Gamma", "Alpha One"]);

    // Recipient filter
    let res = client
        .get(format!("{}/emails?to=alice", base))
        .send()
        .await
        .unwrap();
    assert_eq!(subjects(res.json().await.unwrap()), ["Beta Two"]);

    // Sender wins; the subject hint is ignored
    let res = client
        .get(format!("{}/emails?from=carol&subject=Gamma", base))
        .send()
        .await
        .unwrap();
    assert_eq!(subjects(res.json().await.unwrap()), ["Beta Two"]);

    // Empty hints are skipped
    let res = client
        .get(format!("{}/emails?from=&subject=alpha", base))
        .send()
        .await
        .unwrap();
    assert_eq!(subjects(res.json().await.unwrap()), ["Alpha One"]);

    // No filter lists everything
    let res = client.get(format!("{}/emails", base)).send().await.unwrap();
    assert_eq!(
        subjects(res.json().await.unwrap()),
        ["Gamma", "Beta Two", "Alpha One"]
    );
}

#[tokio::test]
async fn attachments_round_trip_as_base64() {
    let (base, _store, _srv) = start_server().await;
    let client = reqwest::Client::new();
    let id = submit(
        &client,
        &base,
        json!({
            "from": "a@example.test",
            "to": "b@example.test",
            "attachments": "QUJDMTIz",
        }),
    )
    .await;
    let m: serde_json::Value = client
        .get(format!("{}/email/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(m["attachments"], "QUJDMTIz");
}

#[tokio::test]
async fn cors_preflight_allows_any_origin_with_credentials() {
    let (base, _store, _srv) = start_server().await;
    let client = reqwest::Client::new();
    let res = client
        .request(reqwest::Method::OPTIONS, format!("{}/emails", base))
        .header("origin", "http://frontend.test")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let headers = res.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "http://frontend.test"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn malformed_ids_and_queries_are_json_400s() {
    let (base, _store, _srv) = start_server().await;
    let client = reqwest::Client::new();

    for path in ["email/abc", "email/99999999999999999999999"] {
        let res = client.get(format!("{}/{}", base, path)).send().await.unwrap();
        assert_json_error(res, reqwest::StatusCode::BAD_REQUEST).await;
    }
    let res = client
        .post(format!("{}/email/abc/read", base))
        .send()
        .await
        .unwrap();
    assert_json_error(res, reqwest::StatusCode::BAD_REQUEST).await;

    let res = client
        .get(format!("{}/emails?from=a&from=b", base))
        .send()
        .await
        .unwrap();
    assert_json_error(res, reqwest::StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn backend_failures_are_json_500s() {
    let (base, _srv) = serve_with(Arc::new(Unavailable)).await;
    let client = reqwest::Client::new();
    let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;

    let res = client.get(format!("{}/emails", base)).send().await.unwrap();
    assert_json_error(res, status).await;

    let res = client.get(format!("{}/email/1", base)).send().await.unwrap();
    assert_json_error(res, status).await;

    let res = client
        .post(format!("{}/send-email", base))
        .json(&json!({ "from": "a@example.test", "to": "b@example.test" }))
        .send()
        .await
        .unwrap();
    assert_json_error(res, status).await;

    let res = client
        .post(format!("{}/email/1/read", base))
        .send()
        .await
        .unwrap();
    assert_json_error(res, status).await;
}

#[tokio::test]
async fn fetch_fails_when_marking_read_fails() {
    let inner = SqliteStore::in_memory().await.expect("memory sqlite");
    let (base, _srv) = serve_with(Arc::new(ReadFlagFails(inner))).await;
    let client = reqwest::Client::new();

    let id = submit(
        &client,
        &base,
        json!({ "from": "a@example.test", "to": "b@example.test" }),
    )
    .await;

    let res = client
        .get(format!("{}/email/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_json_error(res, reqwest::StatusCode::INTERNAL_SERVER_ERROR).await;

    // The record is still there and still unread.
    let arr: serde_json::Value = client
        .get(format!("{}/emails", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(arr[0]["id"], id);
    assert_eq!(arr[0]["isRead"], false);
}
