//! In-process mock of the Workers KV REST API.
//!
//! The server runs on its own thread and runtime so that both the async and
//! the blocking client can talk to it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use workers_kv::{Namespace, NamespaceConfig};

pub const ACCOUNT: &str = "test-account";
pub const NAMESPACE: &str = "test-namespace";
pub const TOKEN: &str = "test-token";

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    pub store: Mutex<BTreeMap<String, String>>,
    pub requests: Mutex<Vec<Recorded>>,
    pub request_count: AtomicUsize,
    /// Answer writes and deletes with a failure envelope
    pub fail_writes: AtomicBool,
    /// Answer every request with this status and a plain text body
    pub forced_status: Mutex<Option<u16>>,
}

impl MockState {
    pub fn count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Recorded> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.store.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn force_status(&self, status: Option<u16>) {
        *self.forced_status.lock().unwrap() = status;
    }
}

pub struct MockKv {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MockKv {
    pub fn start() -> Self {
        let state = Arc::new(MockState::default());
        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_state = state.clone();
        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("Failed to build mock runtime");

            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("Failed to bind mock listener");
                addr_tx
                    .send(listener.local_addr().expect("No local addr"))
                    .expect("Failed to report mock address");

                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            let Ok((stream, _)) = result else { continue };
                            let state = server_state.clone();
                            tokio::spawn(async move {
                                let service = service_fn(move |req| handle(state.clone(), req));
                                let _ = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), service)
                                    .await;
                            });
                        }
                        _ = &mut shutdown_rx => break,
                    }
                }
            });
        });

        let addr = addr_rx.recv().expect("Mock server did not start");
        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn api_base(&self) -> String {
        format!("http://{}/client/v4", self.addr)
    }

    pub fn config(&self) -> NamespaceConfig {
        NamespaceConfig {
            api_base: self.api_base(),
            timeout_ms: 5000,
            ..NamespaceConfig::new(ACCOUNT, NAMESPACE, TOKEN)
        }
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::with_config(self.config()).expect("Failed to create namespace client")
    }

    pub fn blocking_namespace(&self) -> workers_kv::blocking::Namespace {
        workers_kv::blocking::Namespace::with_config(self.config())
            .expect("Failed to create blocking namespace client")
    }
}

impl Drop for MockKv {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[derive(Deserialize)]
struct BulkEntry {
    key: String,
    value: String,
}

fn prefix() -> String {
    format!("/client/v4/accounts/{}/storage/kv/namespaces/{}", ACCOUNT, NAMESPACE)
}

fn envelope_ok(result: serde_json::Value) -> (StatusCode, String) {
    let body = json!({"success": true, "errors": [], "messages": [], "result": result});
    (StatusCode::OK, body.to_string())
}

fn envelope_err(status: StatusCode, code: i64, message: &str) -> (StatusCode, String) {
    let body = json!({
        "success": false,
        "errors": [{"code": code, "message": message}],
        "messages": [],
        "result": null
    });
    (status, body.to_string())
}

async fn handle(
    state: Arc<MockState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let authorization = header("authorization");
    let content_type = header("content-type");

    let body = match req.into_body().collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(_) => String::new(),
    };

    state.request_count.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        authorization: authorization.clone(),
        content_type,
        body: body.clone(),
    });

    let (status, reply) = route(&state, &method, &path, authorization.as_deref(), &body);
    Ok(Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(reply)))
        .unwrap())
}

fn route(
    state: &MockState,
    method: &Method,
    path: &str,
    authorization: Option<&str>,
    body: &str,
) -> (StatusCode, String) {
    if let Some(status) = *state.forced_status.lock().unwrap() {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, "forced failure".to_string());
    }

    let expected = format!("Bearer {}", TOKEN);
    if authorization != Some(expected.as_str()) {
        return envelope_err(StatusCode::FORBIDDEN, 10000, "Authentication error");
    }

    let Some(rest) = path.strip_prefix(&prefix()) else {
        return envelope_err(StatusCode::NOT_FOUND, 7003, "Could not route to path");
    };

    let is_write = matches!(*method, Method::PUT | Method::DELETE);
    if is_write && state.fail_writes.load(Ordering::SeqCst) {
        return envelope_err(StatusCode::OK, 10001, "simulated write failure");
    }

    match (method, rest) {
        (&Method::GET, "/keys") => {
            let store = state.store.lock().unwrap();
            let keys: Vec<_> = store.keys().map(|k| json!({"name": k})).collect();
            envelope_ok(json!(keys))
        }
        (&Method::PUT, "/bulk") => match serde_json::from_str::<Vec<BulkEntry>>(body) {
            Ok(entries) => {
                let mut store = state.store.lock().unwrap();
                for entry in entries {
                    store.insert(entry.key, entry.value);
                }
                envelope_ok(json!(null))
            }
            Err(e) => envelope_err(StatusCode::BAD_REQUEST, 10012, &e.to_string()),
        },
        (&Method::DELETE, "/bulk") => match serde_json::from_str::<Vec<String>>(body) {
            Ok(keys) => {
                let mut store = state.store.lock().unwrap();
                for key in keys {
                    store.remove(&key);
                }
                envelope_ok(json!(null))
            }
            Err(e) => envelope_err(StatusCode::BAD_REQUEST, 10012, &e.to_string()),
        },
        (_, rest) if rest.starts_with("/values/") => {
            let encoded = &rest["/values/".len()..];
            let key = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
            match *method {
                Method::GET => match state.get(&key) {
                    Some(value) => (StatusCode::OK, value),
                    None => envelope_err(StatusCode::NOT_FOUND, 10009, "get: 'key not found'"),
                },
                Method::PUT => {
                    state.insert(&key, body);
                    envelope_ok(json!(null))
                }
                Method::DELETE => {
                    state.store.lock().unwrap().remove(&key);
                    envelope_ok(json!(null))
                }
                _ => envelope_err(StatusCode::METHOD_NOT_ALLOWED, 10000, "method not allowed"),
            }
        }
        _ => envelope_err(StatusCode::NOT_FOUND, 7003, "Could not route to path"),
    }
}
