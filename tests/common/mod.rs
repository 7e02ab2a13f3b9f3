#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tower::util::ServiceExt;

use checkout_gateway::{config::Config, router, state::AppState};

/// An in-memory stand-in for the hosted record store, speaking its
/// table/record REST contract over an ephemeral port.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    tables: HashMap<String, Vec<serde_json::Value>>,
    next_id: i64,
}

impl MockStore {
    /// Seeds a row directly, returning its assigned id.
    pub fn insert(&self, table: &str, mut row: serde_json::Value) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        row["Id"] = serde_json::json!(id);
        inner.tables.entry(table.to_string()).or_default().push(row);
        id
    }

    /// A snapshot of every row in `table`.
    pub fn rows(&self, table: &str) -> Vec<serde_json::Value> {
        let inner = self.inner.lock().unwrap();
        inner.tables.get(table).cloned().unwrap_or_default()
    }

    /// The single row in `table` with the given id.
    pub fn row(&self, table: &str, id: i64) -> serde_json::Value {
        self.rows(table)
            .into_iter()
            .find(|row| row["Id"] == serde_json::json!(id))
            .unwrap_or_else(|| panic!("no row {id} in {table}"))
    }
}

fn parse_where(clause: &str) -> Option<(String, String)> {
    let inner = clause.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.splitn(3, ',');
    let field = parts.next()?.to_string();
    let _op = parts.next()?;
    let value = parts.next()?.to_string();
    Some((field, value))
}

fn matches(row: &serde_json::Value, field: &str, value: &str) -> bool {
    match row.get(field) {
        Some(serde_json::Value::String(s)) => s == value,
        Some(serde_json::Value::Bool(b)) => b.to_string() == value,
        Some(serde_json::Value::Number(n)) => n.to_string() == value,
        _ => false,
    }
}

fn filtered(rows: &[serde_json::Value], clause: Option<&String>) -> Vec<serde_json::Value> {
    match clause.and_then(|c| parse_where(c)) {
        Some((field, value)) => rows
            .iter()
            .filter(|row| matches(row, &field, &value))
            .cloned()
            .collect(),
        None => rows.to_vec(),
    }
}

async fn list_records(
    State(store): State<MockStore>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let rows = store.rows(&table);
    let list = filtered(&rows, params.get("where"));
    Json(serde_json::json!({ "list": list, "pageInfo": {} }))
}

async fn count_records(
    State(store): State<MockStore>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let rows = store.rows(&table);
    let count = filtered(&rows, params.get("where")).len();
    Json(serde_json::json!({ "count": count }))
}

async fn create_record(
    State(store): State<MockStore>,
    Path(table): Path<String>,
    Json(row): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let id = store.insert(&table, row);
    Json(serde_json::json!({ "Id": id }))
}

async fn patch_record(
    State(store): State<MockStore>,
    Path(table): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let id = patch["Id"].clone();
    let mut inner = store.inner.lock().unwrap();
    let rows = inner.tables.entry(table).or_default();
    let Some(row) = rows.iter_mut().find(|row| row["Id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no such record" })),
        );
    };
    if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    (StatusCode::OK, Json(serde_json::json!({ "Id": id })))
}

/// Spawns the mock record store, returning a handle for seeding and
/// inspection plus the address it listens on.
pub async fn spawn_store() -> (MockStore, SocketAddr) {
    let store = MockStore::default();
    let app = Router::new()
        .route(
            "/api/v2/tables/{table}/records",
            get(list_records).post(create_record).patch(patch_record),
        )
        .route("/api/v2/tables/{table}/records/count", get(count_records))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (store, addr)
}

/// Spawns a stub payment provider answering every transaction route with the
/// given status and body, counting how often it is hit.
pub async fn spawn_provider(
    status: StatusCode,
    body: serde_json::Value,
) -> (Arc<AtomicUsize>, SocketAddr) {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            let body = body.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                (status, Json(body))
            }
        }
    };

    let app = Router::new()
        .route("/v1/transactions", axum::routing::post(handler.clone()))
        .route("/api/user/transactions", axum::routing::post(handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (calls, addr)
}

/// A config wired to the two mocks, with fast outbound timeouts.
pub fn test_config(store: SocketAddr, provider: SocketAddr) -> Config {
    Config {
        record_store_base_url: format!("http://{store}"),
        record_store_token: "test-token".to_string(),
        sessions_table: "sessions".to_string(),
        orders_table: "orders".to_string(),
        customers_table: "customers".to_string(),

        blackcat_base_url: format!("http://{provider}"),
        blackcat_public_key: Some("pk_test".to_string()),
        blackcat_secret_key: Some("sk_test".to_string()),
        hypercash_base_url: format!("http://{provider}"),
        hypercash_secret_key: Some("sk_test".to_string()),

        rate_limit_max_requests: 10,
        rate_limit_window_secs: 60,
        idempotency_ttl_secs: 600,

        sweep_interval_secs: 300,
        inactivity_timeout_secs: 300,

        record_store_timeout_ms: 2000,
        provider_timeout_ms: 2000,
        outbound_max_retries: 2,
        outbound_base_delay_ms: 1,
    }
}

/// Spins up both mocks and assembles the application around them.
pub async fn test_app(
    provider_status: StatusCode,
    provider_body: serde_json::Value,
) -> (Router, AppState, MockStore, Arc<AtomicUsize>) {
    let (store, store_addr) = spawn_store().await;
    let (calls, provider_addr) = spawn_provider(provider_status, provider_body).await;
    let config = test_config(store_addr, provider_addr);
    let state = AppState::new(&config).unwrap();
    (router(state.clone()), state, store, calls)
}

/// A typical provider acceptance artifact.
pub fn provider_artifact() -> serde_json::Value {
    serde_json::json!({
        "status": "PAID",
        "secureId": "sec-1",
        "secureUrl": "https://pay.example/abc",
        "customer": { "id": 777, "name": "Maria Silva" }
    })
}

/// A payload that passes order validation.
pub fn order_payload(external_ref: &str, ip: &str) -> serde_json::Value {
    serde_json::json!({
        "amount": 129.9,
        "paymentMethod": "pix",
        "pix": { "expiresInDays": 1 },
        "items": [{
            "title": "Vinyl record",
            "unitPrice": 129.9,
            "quantity": 1,
            "tangible": true,
            "externalRef": "42"
        }],
        "shipping": {
            "fee": 0.0,
            "address": {
                "street": "Rua A",
                "streetNumber": "100",
                "neighborhood": "Centro",
                "city": "São Paulo",
                "state": "SP",
                "zipCode": "01000-000",
                "country": "BR",
                "complement": ""
            }
        },
        "customer": {
            "name": "Maria Silva",
            "email": "maria@example.com",
            "phone": "11999990000",
            "document": { "number": "12345678909", "type": "cpf" }
        },
        "metadata": { "source": "web" },
        "externalRef": external_ref,
        "ip": ip
    })
}

async fn send(app: &Router, request: axum::http::Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

/// POSTs a JSON body with the client IP carried in `x-forwarded-for`.
pub async fn post_json(
    app: &Router,
    uri: &str,
    ip: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Like [`post_json`] but with an explicit `Idempotency-Key` header.
pub async fn post_json_with_key(
    app: &Router,
    uri: &str,
    ip: &str,
    key: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .header("Idempotency-Key", key)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// GETs a URI, decoding the JSON body.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
