#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use offline_sync::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Value),
    Unreachable,
}

/// In-process backend: replies are scripted per path, falling back to a
/// default, and every request is recorded.
pub struct ScriptedTransport {
    default: Mutex<Reply>,
    scripted: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(default: Reply) -> Self {
        Self {
            default: Mutex::new(default),
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(Reply::Status(200, json!({ "status": "success" })))
    }

    pub fn unreachable() -> Self {
        Self::new(Reply::Unreachable)
    }

    /// Queues `reply` for the next request to `path`.
    pub fn script(&self, path: &str, reply: Reply) {
        self.scripted
            .lock()
            .expect("lock")
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default.lock().expect("lock") = reply;
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = {
            let mut scripted = self.scripted.lock().expect("lock");
            scripted
                .get_mut(&request.path)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| self.default.lock().expect("lock").clone())
        };
        self.calls.lock().expect("lock").push(request);

        match reply {
            Reply::Status(status, body) => Ok(HttpResponse::json(status, &body)),
            Reply::Unreachable => Err(TransportError::Unreachable("scripted".to_string())),
        }
    }
}

pub fn register_payload() -> Value {
    json!({
        "name": "Test User",
        "email": "test@example.com",
        "password": "password123",
        "phone": "123456789"
    })
}
