//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::session::{MemorySessionStore, SessionStore};
use crate::transport::Transport;

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, status: u16, content_type: Option<&str>, body: &[u8]) {
        let headers = content_type
            .map(|ct| vec![("content-type".to_string(), ct.to_string())])
            .unwrap_or_default();
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        }));
    }

    pub(crate) fn push_status(&self, status: u16) {
        self.push(status, None, b"");
    }

    pub(crate) fn push_json(&self, status: u16, body: Value) {
        self.push(status, Some("application/json"), body.to_string().as_bytes());
    }

    pub(crate) fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Transport(message.to_string())));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left")
    }
}

/// Client against `http://localhost:3000` with an in-memory session.
pub(crate) fn client_with(
    transport: Arc<MockTransport>,
    token: Option<&str>,
) -> (ApiClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    if let Some(token) = token {
        store.set(token);
    }
    let client = ApiClient::new(ClientConfig::new("http://localhost:3000"), store.clone(), transport);
    (client, store)
}
