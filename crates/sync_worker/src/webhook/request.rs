use envelope_crypto::VerifyError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A webhook request decoupled from the HTTP framework.
///
/// The server layer converts transport types to this and back so the
/// handlers (and their tests) never touch HTTP machinery. Header names are
/// expected lowercase.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub method: Method,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl WebhookRequest {
    pub fn get() -> Self {
        Self { method: Method::Get, query: HashMap::new(), headers: HashMap::new(), body: String::new() }
    }

    pub fn post(body: impl Into<String>) -> Self {
        Self { method: Method::Post, query: HashMap::new(), headers: HashMap::new(), body: body.into() }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl WebhookResponse {
    pub fn text(body: impl Into<String>) -> Self {
        Self { status: 200, content_type: "text/plain", body: body.into() }
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self { status: 200, content_type: "application/json", body: body.into() }
    }

    pub fn empty() -> Self {
        Self { status: 200, content_type: "text/plain", body: String::new() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: 400, content_type: "text/plain", body: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self { status: 403, content_type: "text/plain", body: message.into() }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self { status: 500, content_type: "text/plain", body: message.into() }
    }
}

/// Envelope failures map to client errors: authenticity failures are 403,
/// undecodable envelopes are 400
pub(crate) fn envelope_rejection(err: &VerifyError) -> WebhookResponse {
    match err {
        VerifyError::SignatureMismatch | VerifyError::ReceiverMismatch { .. } => {
            WebhookResponse::forbidden(err.to_string())
        }
        _ => WebhookResponse::bad_request(err.to_string()),
    }
}
