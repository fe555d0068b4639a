use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::DomainError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use sync_worker::{Method, WebhookRequest, WebhookResponse};
use tracing::error;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/meeting", get(meeting_webhook).post(meeting_webhook))
        .route("/webhook/chat", get(chat_webhook).post(chat_webhook))
        .route("/webhook/payment", post(payment_webhook))
        .route("/sync/recordings", post(sync_recordings))
        .route("/sync/groupchats", post(sync_group_chats))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "ok": true })))
}

async fn meeting_webhook(
    State(st): State<Arc<AppState>>,
    method: axum::http::Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(meeting) = &st.meeting else {
        return unconfigured("meeting");
    };
    let request = to_webhook_request(&method, query, &headers, body);
    from_webhook_response(meeting.webhook.handle(&request).await)
}

async fn chat_webhook(
    State(st): State<Arc<AppState>>,
    method: axum::http::Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(chat) = &st.chat else {
        return unconfigured("chat");
    };
    let request = to_webhook_request(&method, query, &headers, body);
    from_webhook_response(chat.webhook.handle(&request).await)
}

async fn payment_webhook(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(payment) = &st.payment else {
        return unconfigured("payment");
    };
    let request = to_webhook_request(&axum::http::Method::POST, HashMap::new(), &headers, body);
    from_webhook_response(payment.handle(&request).await)
}

#[derive(Debug, Deserialize)]
struct SyncRangeBody {
    start_time: i64,
    end_time: i64,
}

/// Backfill recordings for a time range, replying with the run report
async fn sync_recordings(
    State(st): State<Arc<AppState>>,
    Json(body): Json<SyncRangeBody>,
) -> Response {
    let Some(meeting) = &st.meeting else {
        return unconfigured("meeting");
    };
    match meeting.sync.sync_range(body.start_time, body.end_time).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(DomainError::ValidationError(msg)) => (StatusCode::BAD_REQUEST, msg).into_response(),
        Err(e) => {
            error!(error = %e, "recording backfill failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn sync_group_chats(State(st): State<Arc<AppState>>) -> Response {
    let Some(chat) = &st.chat else {
        return unconfigured("chat");
    };
    match chat.sync.sync_all().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!(error = %e, "group chat sync failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn unconfigured(vendor: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        format!("{vendor} vendor is not configured"),
    )
        .into_response()
}

fn to_webhook_request(
    method: &axum::http::Method,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: String,
) -> WebhookRequest {
    let method = if *method == axum::http::Method::GET { Method::Get } else { Method::Post };
    // Header names arrive lowercase from the http crate
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();
    WebhookRequest { method, query, headers, body }
}

fn from_webhook_response(response: WebhookResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, response.content_type)], response.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_lowercased_for_handlers() {
        let mut headers = HeaderMap::new();
        headers.insert("Timestamp", "1715400000".parse().unwrap());
        headers.insert("Stripe-Signature", "t=1,v1=ab".parse().unwrap());

        let request = to_webhook_request(
            &axum::http::Method::POST,
            HashMap::new(),
            &headers,
            String::new(),
        );

        assert_eq!(request.header("timestamp"), Some("1715400000"));
        assert_eq!(request.header("stripe-signature"), Some("t=1,v1=ab"));
    }

    #[test]
    fn handler_responses_keep_status_and_content_type() {
        let response = from_webhook_response(WebhookResponse::json(r#"{"received":true}"#));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let response = from_webhook_response(WebhookResponse::forbidden("nope"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
