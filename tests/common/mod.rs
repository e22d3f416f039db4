//! A local stand-in for the chat-completion provider.

#![allow(dead_code)]

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One request as the provider saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct FakeProvider {
    pub base_url: String,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeProvider {
    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

/// Serve `/v1/chat/completions`, replying via `reply(request_body)`.
pub async fn spawn_provider<F>(reply: F) -> FakeProvider
where
    F: Fn(&Value) -> (StatusCode, String) + Clone + Send + Sync + 'static,
{
    let seen: Arc<Mutex<Vec<Seen>>> = Arc::default();
    let log = seen.clone();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let log = log.clone();
            let reply = reply.clone();
            async move {
                let (status, text) = reply(&body);
                log.lock().unwrap().push(Seen {
                    authorization: headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    body,
                });
                (status, [(header::CONTENT_TYPE, "application/json")], text)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    FakeProvider {
        base_url: format!("http://{addr}/v1"),
        seen,
    }
}

/// Always reply with the same status and body.
pub async fn spawn_fixed(status: StatusCode, body: impl Into<String>) -> FakeProvider {
    let body = body.into();
    spawn_provider(move |_| (status, body.clone())).await
}

/// A successful completion payload carrying `content`.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// Text of the user message in a recorded request.
pub fn user_prompt(body: &Value) -> &str {
    body["messages"]
        .as_array()
        .and_then(|msgs| msgs.iter().find(|m| m["role"] == "user"))
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
}
