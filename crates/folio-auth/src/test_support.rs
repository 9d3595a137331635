//! Scripted collaborators for unit tests.

use crate::http::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
use crate::ports::{Destination, Navigator, Notice, Notifier};
use crate::{ApiClient, AuthError, AuthResult};
use async_trait::async_trait;
use folio_storage::{MemoryStorage, TokenStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) enum Reply {
    Json(u16, Value),
    Delayed(Duration, u16, Value),
    NetworkError(&'static str),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Json(status, body)
    }

    pub fn delayed(delay: Duration, status: u16, body: Value) -> Self {
        Reply::Delayed(delay, status, body)
    }
}

type Handler = Box<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// Answers requests from per-route handlers and records every call.
/// Unscripted routes answer 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(HttpMethod, String), Handler>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn on<F>(&self, method: HttpMethod, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .insert((method, path.to_string()), Box::new(handler));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> AuthResult<ApiResponse> {
        self.calls.lock().push(request.clone());

        let reply = {
            let routes = self.routes.lock();
            match routes.get(&(request.method, request.path.clone())) {
                Some(handler) => handler(request),
                None => Reply::Json(404, json!({"detail": "Not found."})),
            }
        };

        match reply {
            Reply::Json(status, body) => Ok(ApiResponse::new(status, body.to_string())),
            Reply::Delayed(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(ApiResponse::new(status, body.to_string()))
            }
            Reply::NetworkError(message) => Err(AuthError::Network(message.to_string())),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    visited: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<Destination> {
        self.visited.lock().clone()
    }

    pub fn last(&self) -> Option<Destination> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.visited.lock().push(destination);
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

pub(crate) struct Fixture {
    pub transport: Arc<ScriptedTransport>,
    pub tokens: Arc<TokenStore>,
    pub api: ApiClient,
}

/// An [`ApiClient`] over a scripted transport and in-memory token storage.
pub(crate) fn fixture() -> Fixture {
    let transport = Arc::new(ScriptedTransport::default());
    let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
    let api = ApiClient::new(
        Arc::clone(&transport) as Arc<dyn HttpTransport>,
        Arc::clone(&tokens),
        REFRESH_TIMEOUT,
    );
    Fixture {
        transport,
        tokens,
        api,
    }
}

pub(crate) fn user_json(id: u64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{}@folio.test", username),
        "avatar": null,
        "bio": null
    })
}
