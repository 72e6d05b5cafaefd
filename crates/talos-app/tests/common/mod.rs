//! Shared fixtures for app integration tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use talos_api::{ApiRequest, ApiResponse, ApiTransport};
use talos_app::{App, ClientConfig};
use talos_contract::{
    ApiError, AUTH_STATUS_PATH, CREATE_CATEGORY_PATH, DECRYPT_PATH, DELETE_PATH, HEALTH_PATH,
    LOGIN_PATH, LOGOUT_PATH, SAVE_PATH, TREE_PATH, VERSION_PATH,
};
use talos_core::{HIDDEN_SECRET_TOKEN, KEEP_SECRET_TOKEN};
use url::Url;

/// Master key accepted by [`FakeServer`].
#[allow(dead_code)]
pub const MASTER_KEY: &str = "correct horse battery staple";

/// Mutable server-side state.
#[derive(Debug, Default)]
pub struct ServerState {
    pub initialized: bool,
    pub authenticated: bool,
    pub healthy: bool,
    pub records: BTreeMap<String, String>,
    pub categories: Vec<String>,
    pub calls: Vec<&'static str>,
}

/// In-memory stand-in for the Talos server.
#[derive(Debug, Default)]
pub struct FakeServer {
    pub state: Mutex<ServerState>,
}

impl FakeServer {
    /// Initialized, unlocked, healthy server holding `records`.
    #[allow(dead_code)]
    pub fn unlocked(records: &[(&str, &str)]) -> Arc<Self> {
        let server = Self::locked(records);
        server.state.lock().expect("state lock").authenticated = true;
        server
    }

    /// Initialized, locked, healthy server holding `records`.
    pub fn locked(records: &[(&str, &str)]) -> Arc<Self> {
        let server = Self::default();
        {
            let mut state = server.state.lock().expect("state lock");
            state.initialized = true;
            state.healthy = true;
            state.records = records
                .iter()
                .map(|(path, blob)| (path.to_string(), blob.to_string()))
                .collect();
        }
        Arc::new(server)
    }

    /// Number of requests sent to `path`.
    #[allow(dead_code)]
    pub fn calls_to(&self, path: &str) -> usize {
        let state = self.state.lock().expect("state lock");
        state.calls.iter().filter(|called| **called == path).count()
    }

    /// Stored blob of `path`.
    #[allow(dead_code)]
    pub fn record(&self, path: &str) -> Option<String> {
        self.state.lock().expect("state lock").records.get(path).cloned()
    }

    #[allow(dead_code)]
    pub fn set_healthy(&self, healthy: bool) {
        self.state.lock().expect("state lock").healthy = healthy;
    }

    #[allow(dead_code)]
    pub fn is_authenticated(&self) -> bool {
        self.state.lock().expect("state lock").authenticated
    }

    fn route(&self, path: &'static str, body: Value) -> (u16, Value) {
        let mut state = self.state.lock().expect("state lock");
        state.calls.push(path);

        match path {
            AUTH_STATUS_PATH => (
                200,
                json!({
                    "initialized": state.initialized,
                    "authenticated": state.authenticated,
                    "auth_method": state.authenticated.then_some("password"),
                }),
            ),
            LOGIN_PATH => {
                if body["key"] == MASTER_KEY {
                    state.authenticated = true;
                    (200, json!({ "success": true }))
                } else {
                    (401, json!({ "error": "Invalid Master Key" }))
                }
            }
            LOGOUT_PATH => {
                state.authenticated = false;
                (200, json!({ "success": true }))
            }
            HEALTH_PATH => (
                200,
                json!({
                    "storage": state.healthy,
                    "bunker": if state.healthy { "UNSEALED" } else { "SEALED" },
                }),
            ),
            VERSION_PATH => (200, json!({ "version": "2.4.0" })),
            _ if !state.authenticated => (401, json!({ "error": "Unauthorized" })),
            TREE_PATH => {
                let nodes: Vec<Value> = state
                    .records
                    .keys()
                    .map(|path| {
                        let name = path.rsplit('/').next().unwrap_or(path);
                        json!({ "name": name, "path": path, "is_dir": false })
                    })
                    .collect();
                (200, Value::Array(nodes))
            }
            DECRYPT_PATH => {
                let target = body["path"].as_str().unwrap_or_default();
                match state.records.get(target) {
                    Some(blob) if body["reveal"] == true => (200, json!(blob)),
                    Some(blob) => {
                        let rest = blob.split_once('\n').map_or("", |(_, rest)| rest);
                        (200, json!(format!("{HIDDEN_SECRET_TOKEN}\n{rest}")))
                    }
                    None => (404, json!({ "error": "Secret not found" })),
                }
            }
            SAVE_PATH => {
                let target = body["path"].as_str().unwrap_or_default().to_string();
                let content = body["content"].as_str().unwrap_or_default();
                let source = body["original_path"]
                    .as_str()
                    .unwrap_or(&target)
                    .to_string();

                let content = match content.split_once('\n') {
                    Some((KEEP_SECRET_TOKEN, rest)) => {
                        let stored = state.records.get(&source).cloned().unwrap_or_default();
                        let first = stored.split('\n').next().unwrap_or_default().to_string();
                        format!("{first}\n{rest}")
                    }
                    _ => content.to_string(),
                };
                if source != target {
                    state.records.remove(&source);
                }
                state.records.insert(target, content);
                (200, json!({ "success": true }))
            }
            DELETE_PATH => {
                let target = body["path"].as_str().unwrap_or_default();
                match state.records.remove(target) {
                    Some(_) => (200, json!({ "success": true })),
                    None => (404, json!({ "error": "Secret not found" })),
                }
            }
            CREATE_CATEGORY_PATH => {
                let target = body["path"].as_str().unwrap_or_default().to_string();
                state.categories.push(target);
                (200, json!({ "success": true }))
            }
            _ => (404, json!({ "error": "Not found" })),
        }
    }
}

#[async_trait]
impl ApiTransport for FakeServer {
    async fn send(&self, _base: &Url, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body = request
            .body
            .as_ref()
            .map(|body| serde_json::from_str(body).expect("request body is JSON"))
            .unwrap_or(Value::Null);
        let (status, reply) = self.route(request.path, body);
        Ok(ApiResponse {
            status,
            body: reply.to_string(),
        })
    }
}

/// Transport that holds decrypt responses for `slow_path` for `delay`.
#[allow(dead_code)]
pub struct SlowDecrypt {
    pub server: Arc<FakeServer>,
    pub slow_path: &'static str,
    pub delay: Duration,
}

#[async_trait]
impl ApiTransport for SlowDecrypt {
    async fn send(&self, base: &Url, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.server.send(base, request).await;
        let slow = request.path == DECRYPT_PATH
            && request.body.as_ref().is_some_and(|body| {
                let body: Value = serde_json::from_str(body).expect("request body is JSON");
                body["path"] == self.slow_path
            });
        if slow {
            tokio::time::sleep(self.delay).await;
        }
        response
    }
}

/// App wired to `server` with the given idle budget.
pub fn app_with(server: &Arc<FakeServer>, idle_timeout: Duration) -> App {
    let mut config = ClientConfig::from_lookup(|_| None).expect("default config is valid");
    config.idle_timeout = idle_timeout;
    App::new(&config, server.clone()).expect("app builds")
}

/// App wired to `server` with the default idle budget.
#[allow(dead_code)]
pub fn app(server: &Arc<FakeServer>) -> App {
    app_with(server, Duration::from_secs(900))
}
