use crate::webhook::request::{envelope_rejection, Method, WebhookRequest, WebhookResponse};
use common::ChatMessage;
use envelope_crypto::ChatCrypto;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
struct EncryptedBody {
    encrypt: String,
}

/// Chat vendor webhook: GET URL verification plus encrypted POST callbacks.
///
/// Text messages get an encrypted acknowledgement reply; event callbacks are
/// logged and acknowledged with an empty body.
pub struct ChatWebhookHandler {
    crypto: ChatCrypto,
}

impl ChatWebhookHandler {
    pub fn new(crypto: ChatCrypto) -> Self {
        Self { crypto }
    }

    pub async fn handle(&self, request: &WebhookRequest) -> WebhookResponse {
        match request.method {
            Method::Get => self.verify_url(request),
            Method::Post => self.callback(request),
        }
    }

    #[instrument(skip(self, request))]
    fn verify_url(&self, request: &WebhookRequest) -> WebhookResponse {
        let Some((msg_signature, timestamp, nonce)) = Self::signature_params(request) else {
            return WebhookResponse::bad_request("missing signature parameters");
        };
        let Some(echostr) = request.query("echostr") else {
            return WebhookResponse::bad_request("missing echostr");
        };

        match self.crypto.verify_url(msg_signature, timestamp, nonce, echostr) {
            Ok(plain) => WebhookResponse::text(plain),
            Err(e) => {
                warn!(error = %e, "url verification rejected");
                envelope_rejection(&e)
            }
        }
    }

    #[instrument(skip(self, request))]
    fn callback(&self, request: &WebhookRequest) -> WebhookResponse {
        let Some((msg_signature, timestamp, nonce)) = Self::signature_params(request) else {
            return WebhookResponse::bad_request("missing signature parameters");
        };
        let body: EncryptedBody = match serde_json::from_str(&request.body) {
            Ok(body) => body,
            Err(e) => return WebhookResponse::bad_request(format!("invalid body: {e}")),
        };

        let plain = match self
            .crypto
            .verify_and_decrypt(msg_signature, timestamp, nonce, &body.encrypt)
        {
            Ok(plain) => plain,
            Err(e) => {
                warn!(error = %e, "callback envelope rejected");
                return envelope_rejection(&e);
            }
        };
        let message: ChatMessage = match serde_json::from_str(&plain) {
            Ok(message) => message,
            Err(e) => return WebhookResponse::bad_request(format!("invalid message: {e}")),
        };

        match message.msg_type.as_str() {
            "event" => {
                info!(
                    event = message.event.as_deref().unwrap_or("unknown"),
                    change_type = message.change_type.as_deref().unwrap_or(""),
                    "chat event received"
                );
                WebhookResponse::empty()
            }
            "text" => self.text_reply(&message, timestamp, nonce),
            other => {
                info!(msg_type = other, "ignoring unhandled message type");
                WebhookResponse::empty()
            }
        }
    }

    fn text_reply(&self, message: &ChatMessage, timestamp: &str, nonce: &str) -> WebhookResponse {
        info!(
            from = message.from_user.as_deref().unwrap_or(""),
            "text message received"
        );
        let reply = json!({
            "msg_type": "text",
            "to_user": message.from_user,
            "from_user": message.to_user,
            "create_time": message.create_time,
            "content": "message received",
        })
        .to_string();

        match self.crypto.encrypt_reply(&reply, timestamp, nonce) {
            Ok(envelope) => match serde_json::to_string(&envelope) {
                Ok(body) => WebhookResponse::json(body),
                Err(e) => WebhookResponse::server_error(format!("encoding reply: {e}")),
            },
            Err(e) => {
                warn!(error = %e, "failed to encrypt reply, acknowledging instead");
                WebhookResponse::empty()
            }
        }
    }

    fn signature_params(request: &WebhookRequest) -> Option<(&str, &str, &str)> {
        Some((
            request.query("msg_signature")?,
            request.query("timestamp")?,
            request.query("nonce")?,
        ))
    }
}
