//! # Mock Marketplace Backend
//!
//! An axum server on `127.0.0.1:0` serving what a storefront talks to:
//!
//! - `GET  /api/public/sponsored-content`: `{ "content": [..] }` from the
//!   current document set. Can be made slow or failing.
//! - `POST /api/public/sponsored-content/{id}/{impression|click}`: counts
//!   engagement. The id `broken` answers `500`.
//! - `GET  /realtime`: WebSocket gateway. Records the subscribe frame, pushes
//!   the initial snapshot (if any), then forwards whatever the test pushes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// What the test asks the open WebSocket connections to do.
#[derive(Debug, Clone)]
enum WsCommand {
    Frame(String),
    Close,
}

#[derive(Debug)]
struct MockState {
    content: Mutex<Vec<Value>>,
    initial_snapshot: Mutex<Option<Vec<Value>>>,
    fail_polls: AtomicBool,
    poll_delay_ms: AtomicU64,
    polls: AtomicUsize,
    poll_queries: Mutex<Vec<HashMap<String, String>>>,
    poll_auth: Mutex<Option<String>>,
    engagement: Mutex<HashMap<(String, String), usize>>,
    subscriptions: Mutex<Vec<Value>>,
    ws_tx: broadcast::Sender<WsCommand>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running mock backend. Dropping it stops the server.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockBackend {
    /// Binds an ephemeral port and starts serving.
    pub async fn start() -> anyhow::Result<Self> {
        let (ws_tx, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            content: Mutex::new(Vec::new()),
            initial_snapshot: Mutex::new(None),
            fail_polls: AtomicBool::new(false),
            poll_delay_ms: AtomicU64::new(0),
            polls: AtomicUsize::new(0),
            poll_queries: Mutex::new(Vec::new()),
            poll_auth: Mutex::new(None),
            engagement: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
            ws_tx,
        });

        let app = Router::new()
            .route("/api/public/sponsored-content", get(list_content))
            .route("/api/public/sponsored-content/{id}/{kind}", post(record_engagement))
            .route("/realtime", get(realtime))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock backend stopped: {e}");
            }
        });

        Ok(Self { addr, state, task })
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `ws://127.0.0.1:<port>/realtime`
    pub fn realtime_url(&self) -> String {
        format!("ws://{}/realtime", self.addr)
    }

    /// Replaces the documents served by the polling endpoint.
    pub fn set_content(&self, docs: Vec<Value>) {
        *lock(&self.state.content) = docs;
    }

    /// Snapshot sent to every new subscriber right after its subscribe frame.
    pub fn set_initial_snapshot(&self, docs: Vec<Value>) {
        *lock(&self.state.initial_snapshot) = Some(docs);
    }

    /// Pushes a snapshot to every open subscription.
    pub fn push_snapshot(&self, docs: Vec<Value>) {
        let frame = json!({ "type": "snapshot", "docs": docs }).to_string();
        let _ = self.state.ws_tx.send(WsCommand::Frame(frame));
    }

    /// Pushes an error callback to every open subscription.
    pub fn push_error(&self, message: &str) {
        let frame = json!({ "type": "error", "message": message }).to_string();
        let _ = self.state.ws_tx.send(WsCommand::Frame(frame));
    }

    /// Closes every open subscription from the server side.
    pub fn close_subscriptions(&self) {
        let _ = self.state.ws_tx.send(WsCommand::Close);
    }

    /// Makes the polling endpoint answer `500`.
    pub fn fail_polls(&self, fail: bool) {
        self.state.fail_polls.store(fail, Ordering::SeqCst);
    }

    /// Delays every polling response.
    pub fn set_poll_delay(&self, delay: Duration) {
        self.state.poll_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of polling requests received.
    pub fn poll_count(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// Query string of the latest polling request.
    pub fn last_poll_query(&self) -> Option<HashMap<String, String>> {
        lock(&self.state.poll_queries).last().cloned()
    }

    /// `Authorization` header of the latest polling request.
    pub fn last_poll_authorization(&self) -> Option<String> {
        lock(&self.state.poll_auth).clone()
    }

    /// Number of `kind` events received for `id`.
    pub fn engagement_count(&self, id: &str, kind: &str) -> usize {
        lock(&self.state.engagement)
            .get(&(id.to_string(), kind.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Subscribe frames received so far.
    pub fn subscriptions(&self) -> Vec<Value> {
        lock(&self.state.subscriptions).clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn list_content(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.polls.fetch_add(1, Ordering::SeqCst);
    lock(&state.poll_queries).push(query);
    *lock(&state.poll_auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let delay = state.poll_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.fail_polls.load(Ordering::SeqCst) {
        let body = Json(json!({ "error": "unavailable" }));
        return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    }

    let content = lock(&state.content).clone();
    Json(json!({ "content": content })).into_response()
}

async fn record_engagement(
    State(state): State<Arc<MockState>>,
    Path((id, kind)): Path<(String, String)>,
) -> Response {
    if id == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if kind != "impression" && kind != "click" {
        return StatusCode::NOT_FOUND.into_response();
    }
    *lock(&state.engagement).entry((id, kind)).or_insert(0) += 1;
    Json(json!({ "success": true })).into_response()
}

async fn realtime(State(state): State<Arc<MockState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_subscription(socket, state))
}

async fn serve_subscription(mut socket: WebSocket, state: Arc<MockState>) {
    let mut commands = state.ws_tx.subscribe();

    match socket.recv().await {
        Some(Ok(Message::Text(text))) => {
            let frame: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
            lock(&state.subscriptions).push(frame);
        }
        _ => return,
    }

    let ack = json!({ "type": "ack" }).to_string();
    if socket.send(Message::Text(ack.into())).await.is_err() {
        return;
    }

    let initial = lock(&state.initial_snapshot).clone();
    if let Some(docs) = initial {
        let frame = json!({ "type": "snapshot", "docs": docs }).to_string();
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Ok(WsCommand::Frame(frame)) => {
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Ok(WsCommand::Close) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
