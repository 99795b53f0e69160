// Scripted in-process HTTP server for provider tests

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

/// One canned response
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: "application/octet-stream",
            body,
        }
    }
}

/// A request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub api_key: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, VecDeque<Reply>>,
    log: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<Script>>;

/// Server bound to an ephemeral port on 127.0.0.1.
///
/// Routes are keyed by `"METHOD /path"` (no query string). Each route replays
/// its queue in order and keeps repeating the last reply. Unscripted routes
/// answer 404.
pub struct MockServer {
    addr: SocketAddr,
    script: Shared,
}

impl MockServer {
    pub async fn start() -> Self {
        let script: Shared = Arc::new(Mutex::new(Script::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(script.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server failed");
        });

        Self { addr, script }
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Replace the reply queue for a route
    pub fn script(&self, route: &str, replies: Vec<Reply>) {
        let mut script = self.script.lock().expect("script lock");
        script.routes.insert(route.to_string(), replies.into());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().expect("script lock").log.clone()
    }

    pub fn hits(&self, route: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| format!("{} {}", r.method, r.path) == route)
            .count()
    }
}

async fn handle(
    State(script): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let reply = {
        let mut script = script.lock().expect("script lock");
        script.log.push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: header_str(header::AUTHORIZATION.as_str()),
            api_key: header_str("x-api-key"),
            body,
        });

        let route = format!("{} {}", method, uri.path());
        script.routes.get_mut(&route).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    match reply {
        Some(reply) => (
            StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(header::CONTENT_TYPE, reply.content_type)],
            reply.body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "not scripted").into_response(),
    }
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("songforge-{}-{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
