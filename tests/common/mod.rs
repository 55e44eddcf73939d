//! In-process etcd v2 keys server for integration tests.
//!
//! Implements the subset of the keys API the client drives: scalar and directory writes
//! with `prevExist`/`prevValue`/`prevIndex`, in-order creation, deletes, directory listing
//! and `wait`/`waitIndex` long polls. TTLs are recorded but never expire.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use etcd_keys_client::{Client, ClientConfig};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use url::form_urlencoded;

const KEYS_PREFIX: &str = "/v2/keys";

#[derive(Debug, Clone)]
struct Entry {
    value: Option<String>,
    dir: bool,
    ttl: Option<u64>,
    created: u64,
    modified: u64,
}

#[derive(Debug, Clone)]
struct Event {
    index: u64,
    key: String,
    body: Value,
}

#[derive(Default)]
struct Store {
    index: u64,
    entries: BTreeMap<String, Entry>,
    events: Vec<Event>,
    requests: usize,
}

type Reply = (StatusCode, Value);

fn store_error(status: StatusCode, code: u64, message: &str, cause: &str, index: u64) -> Reply {
    (
        status,
        json!({"errorCode": code, "message": message, "cause": cause, "index": index}),
    )
}

fn child_prefix(key: &str) -> String {
    if key == "/" {
        "/".to_string()
    } else {
        format!("{}/", key)
    }
}

impl Store {
    fn node_json(key: &str, entry: &Entry) -> Value {
        let mut node = json!({
            "key": key,
            "createdIndex": entry.created,
            "modifiedIndex": entry.modified,
        });
        if entry.dir {
            node["dir"] = json!(true);
        } else {
            node["value"] = json!(entry.value.clone().unwrap_or_default());
        }
        if let Some(ttl) = entry.ttl {
            node["ttl"] = json!(ttl);
        }
        node
    }

    fn children(&self, key: &str, recursive: bool) -> Vec<Value> {
        let prefix = child_prefix(key);
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix) && !k[prefix.len()..].contains('/'))
            .map(|(k, e)| {
                let mut node = Self::node_json(k, e);
                if e.dir && recursive {
                    node["nodes"] = json!(self.children(k, true));
                }
                node
            })
            .collect()
    }

    fn has_children(&self, key: &str) -> bool {
        let prefix = child_prefix(key);
        self.entries.keys().any(|k| k.starts_with(&prefix))
    }

    fn ensure_parents(&mut self, key: &str) {
        let mut parent = key;
        while let Some(pos) = parent.rfind('/') {
            parent = &parent[..pos];
            if parent.is_empty() {
                break;
            }
            self.entries.entry(parent.to_string()).or_insert(Entry {
                value: None,
                dir: true,
                ttl: None,
                created: self.index,
                modified: self.index,
            });
        }
    }

    fn record(&mut self, key: &str, body: Value) {
        self.events.push(Event {
            index: self.index,
            key: key.to_string(),
            body,
        });
    }

    fn get(&self, key: &str, params: &HashMap<String, String>) -> Reply {
        if key == "/" {
            let nodes = self.children("/", flag(params, "recursive"));
            return (
                StatusCode::OK,
                json!({"action": "get", "node": {"key": "/", "dir": true, "nodes": nodes}}),
            );
        }
        let Some(entry) = self.entries.get(key) else {
            return store_error(StatusCode::NOT_FOUND, 100, "Key not found", key, self.index);
        };
        let mut node = Self::node_json(key, entry);
        if entry.dir {
            node["nodes"] = json!(self.children(key, flag(params, "recursive")));
        }
        (StatusCode::OK, json!({"action": "get", "node": node}))
    }

    fn put(&mut self, key: &str, params: &HashMap<String, String>) -> Reply {
        let existing = self.entries.get(key).cloned();
        let prev_exist = params.get("prevExist").map(|v| v == "true");
        let prev_value = params.get("prevValue");
        let prev_index = params.get("prevIndex").and_then(|v| v.parse::<u64>().ok());
        let dir = flag(params, "dir");

        if prev_exist == Some(false) && existing.is_some() {
            return store_error(
                StatusCode::PRECONDITION_FAILED,
                105,
                "Key already exists",
                key,
                self.index,
            );
        }
        if (prev_exist == Some(true) || prev_value.is_some() || prev_index.is_some())
            && existing.is_none()
        {
            return store_error(StatusCode::NOT_FOUND, 100, "Key not found", key, self.index);
        }
        if let Some(current) = &existing {
            if let Some(expected) = prev_value {
                let actual = current.value.clone().unwrap_or_default();
                if &actual != expected {
                    return store_error(
                        StatusCode::PRECONDITION_FAILED,
                        101,
                        "Compare failed",
                        &format!("[{} != {}]", expected, actual),
                        self.index,
                    );
                }
            }
            if let Some(expected) = prev_index {
                if current.modified != expected {
                    return store_error(
                        StatusCode::PRECONDITION_FAILED,
                        101,
                        "Compare failed",
                        &format!("[{} != {}]", expected, current.modified),
                        self.index,
                    );
                }
            }
            if current.dir && !dir {
                return store_error(StatusCode::FORBIDDEN, 102, "Not a file", key, self.index);
            }
        }

        let action = if prev_value.is_some() || prev_index.is_some() {
            "compareAndSwap"
        } else if prev_exist == Some(false) {
            "create"
        } else if prev_exist == Some(true) {
            "update"
        } else {
            "set"
        };

        self.index += 1;
        let ttl = params.get("ttl").and_then(|v| v.parse::<u64>().ok());
        let entry = Entry {
            value: if dir { None } else { Some(params.get("value").cloned().unwrap_or_default()) },
            dir,
            ttl,
            created: match (&existing, action) {
                (Some(e), "update") | (Some(e), "compareAndSwap") => e.created,
                _ => self.index,
            },
            modified: self.index,
        };
        self.ensure_parents(key);
        self.entries.insert(key.to_string(), entry.clone());

        let mut body = json!({"action": action, "node": Self::node_json(key, &entry)});
        if let Some(prev) = &existing {
            body["prevNode"] = Self::node_json(key, prev);
        }
        self.record(key, body.clone());
        let status = if existing.is_some() { StatusCode::OK } else { StatusCode::CREATED };
        (status, body)
    }

    fn post(&mut self, dir: &str, params: &HashMap<String, String>) -> Reply {
        if let Some(existing) = self.entries.get(dir) {
            if !existing.dir {
                return store_error(StatusCode::FORBIDDEN, 104, "Not a directory", dir, self.index);
            }
        }
        let key = format!("{}/{:020}", dir.trim_end_matches('/'), self.index + 1);
        let mut params = params.clone();
        params.remove("prevExist");
        params.remove("prevValue");
        params.remove("prevIndex");
        params.remove("dir");
        let (status, mut body) = self.put(&key, &params);
        body["action"] = json!("create");
        if let Some(last) = self.events.last_mut() {
            last.body["action"] = json!("create");
        }
        (status, body)
    }

    fn delete(&mut self, key: &str, params: &HashMap<String, String>) -> Reply {
        let Some(existing) = self.entries.get(key).cloned() else {
            return store_error(StatusCode::NOT_FOUND, 100, "Key not found", key, self.index);
        };
        let recursive = flag(params, "recursive");
        if existing.dir && !(flag(params, "dir") || recursive) {
            return store_error(StatusCode::FORBIDDEN, 102, "Not a file", key, self.index);
        }
        if existing.dir && !recursive && self.has_children(key) {
            return store_error(StatusCode::FORBIDDEN, 108, "Directory not empty", key, self.index);
        }
        let prev_value = params.get("prevValue");
        let prev_index = params.get("prevIndex").and_then(|v| v.parse::<u64>().ok());
        if let Some(expected) = prev_value {
            if existing.value.as_ref() != Some(expected) {
                return store_error(
                    StatusCode::PRECONDITION_FAILED,
                    101,
                    "Compare failed",
                    key,
                    self.index,
                );
            }
        }
        if let Some(expected) = prev_index {
            if existing.modified != expected {
                return store_error(
                    StatusCode::PRECONDITION_FAILED,
                    101,
                    "Compare failed",
                    key,
                    self.index,
                );
            }
        }

        self.index += 1;
        let prefix = child_prefix(key);
        self.entries.retain(|k, _| k != key && !k.starts_with(&prefix));

        let action = if prev_value.is_some() || prev_index.is_some() {
            "compareAndDelete"
        } else {
            "delete"
        };
        let mut node = json!({
            "key": key,
            "createdIndex": existing.created,
            "modifiedIndex": self.index,
        });
        if existing.dir {
            node["dir"] = json!(true);
        }
        let body = json!({
            "action": action,
            "node": node,
            "prevNode": Self::node_json(key, &existing),
        });
        self.record(key, body.clone());
        (StatusCode::OK, body)
    }

    fn find_event(&self, key: &str, since: u64, recursive: bool) -> Option<Event> {
        let prefix = child_prefix(key);
        self.events
            .iter()
            .find(|e| e.index >= since && (e.key == key || (recursive && e.key.starts_with(&prefix))))
            .cloned()
    }
}

fn flag(params: &HashMap<String, String>, name: &str) -> bool {
    params.get(name).map(|v| v == "true").unwrap_or(false)
}

#[derive(Default)]
struct Shared {
    store: Mutex<Store>,
    changed: Notify,
}

impl Shared {
    async fn watch(&self, key: &str, params: &HashMap<String, String>) -> Reply {
        let recursive = flag(params, "recursive");
        let since = {
            let store = self.store.lock().unwrap();
            params
                .get("waitIndex")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(store.index + 1)
        };
        loop {
            // Register before checking so a change between the check and the await is not lost.
            let notified = self.changed.notified();
            let found = self.store.lock().unwrap().find_event(key, since, recursive);
            if let Some(event) = found {
                return (StatusCode::OK, event.body);
            }
            notified.await;
        }
    }
}

async fn handle(shared: Arc<Shared>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let mut params: HashMap<String, String> = req
        .uri()
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();
    params.extend(form_urlencoded::parse(&body).into_owned());

    shared.store.lock().unwrap().requests += 1;

    let (status, body) = match (method.clone(), path.as_str()) {
        (Method::GET, "/version") => (
            StatusCode::OK,
            json!({"etcdserver": "2.3.8", "etcdcluster": "2.3.0"}),
        ),
        (Method::GET, "/health") => (StatusCode::OK, json!({"health": "true"})),
        (Method::GET, "/v2/stats/store") => {
            let store = shared.store.lock().unwrap();
            (StatusCode::OK, json!({"watchers": 0, "setsSuccess": store.events.len()}))
        }
        (method, p) if p.starts_with(KEYS_PREFIX) => {
            let key = match &p[KEYS_PREFIX.len()..] {
                "" => "/".to_string(),
                k => k.trim_end_matches('/').to_string(),
            };
            let key = if key.is_empty() { "/".to_string() } else { key };
            match method {
                Method::GET if flag(&params, "wait") => shared.watch(&key, &params).await,
                Method::GET => shared.store.lock().unwrap().get(&key, &params),
                Method::PUT => shared.store.lock().unwrap().put(&key, &params),
                Method::POST => shared.store.lock().unwrap().post(&key, &params),
                Method::DELETE => shared.store.lock().unwrap().delete(&key, &params),
                _ => (StatusCode::METHOD_NOT_ALLOWED, json!({})),
            }
        }
        _ => (StatusCode::NOT_FOUND, json!("404 page not found")),
    };

    if status.is_success() {
        shared.changed.notify_waiters();
    }

    let index = shared.store.lock().unwrap().index;
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("x-etcd-index", index.to_string())
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// A running fake store; stops accepting connections when dropped
pub struct FakeEtcd {
    addr: SocketAddr,
    shared: Arc<Shared>,
    accept_task: JoinHandle<()>,
}

impl FakeEtcd {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared::default());

        let accept_shared = shared.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let shared = accept_shared.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let shared = shared.clone();
                        async move { Ok::<_, Infallible>(handle(shared, req).await) }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            shared,
            accept_task,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> Client {
        Client::new(&self.endpoint()).unwrap()
    }

    pub fn client_with_timeout(&self, read_timeout_ms: u64) -> Client {
        Client::with_config(ClientConfig {
            endpoint: self.endpoint(),
            read_timeout_ms,
            ..Default::default()
        })
        .unwrap()
    }

    /// Number of requests the server has received so far
    pub fn request_count(&self) -> usize {
        self.shared.store.lock().unwrap().requests
    }

    /// Current store index
    pub fn index(&self) -> u64 {
        self.shared.store.lock().unwrap().index
    }
}

impl Drop for FakeEtcd {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
