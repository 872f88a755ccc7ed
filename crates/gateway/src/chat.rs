//! `POST /v1/assistant/chat`
//!
//! Runs the agent loop for one conversation turn and streams the result back
//! as server-sent events.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Json, Response,
        sse::{Event as SseEvent, Sse},
    },
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use bizpilot_agent::{LoopResult, SimulatedStream, SystemPrompt};
use bizpilot_core::error::ProviderError;
use bizpilot_core::message::{Message, Role, Transcript};
use bizpilot_core::tenant::{TenantContext, TenantId};
use bizpilot_core::tool::TenantToolbox;

use crate::{GatewayState, SharedState};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub current_page_hint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Reject requests the loop cannot act on: nothing to answer, a history that
/// does not open with the user or alternate turns, or a last message that is
/// not the user's.
fn validate(request: &ChatRequest) -> Result<(), &'static str> {
    let messages = &request.messages;
    if messages.first().is_some_and(|first| first.role != Role::User) {
        return Err("first message must be from the user");
    }
    if messages.windows(2).any(|pair| pair[0].role == pair[1].role) {
        return Err("messages must alternate between user and assistant");
    }
    match messages.last() {
        None => Err("messages must not be empty"),
        Some(last) if last.role != Role::User => Err("last message must be from the user"),
        Some(last) if last.content.trim().is_empty() => Err("last message must not be blank"),
        Some(_) => Ok(()),
    }
}

pub fn transcript_of(messages: Vec<ChatMessage>) -> Transcript {
    messages
        .into_iter()
        .map(|m| match m.role {
            Role::User => Message::user(m.content),
            Role::Assistant => Message::assistant(m.content),
        })
        .collect::<Vec<_>>()
        .into()
}

/// Run one assistant turn for `tenant_id` on behalf of `user`.
///
/// Loads the business profile, picks reference knowledge for the
/// conversation, renders the system prompt and drives the agent loop with the
/// tenant's toolbox.
pub async fn answer(
    state: &GatewayState,
    tenant_id: TenantId,
    user: &str,
    transcript: Transcript,
    page_hint: Option<&str>,
) -> Result<LoopResult, ProviderError> {
    let profile = match state.store.business_profile(&tenant_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(tenant = %tenant_id.as_str(), error = %e, "Failed to load business profile");
            None
        }
    };

    let system = {
        let selection = state.selector.select_for(&transcript);
        let mut prompt = SystemPrompt::new(chrono::Utc::now().date_naive())
            .page_hint(page_hint)
            .knowledge(selection.fragments());
        if let Some(profile) = &profile {
            prompt = prompt.business(&profile.name);
        }
        prompt.render()
    };

    let ctx = TenantContext::new(
        tenant_id,
        user,
        state.store.clone(),
        state.messenger.clone(),
        state.audit.clone(),
    );
    let toolbox = TenantToolbox::new(Arc::clone(&state.registry), ctx);
    state.agent.run(&system, transcript, &toolbox).await
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let (Some(tenant), Some(user)) = (
        header_value(&headers, TENANT_HEADER),
        header_value(&headers, USER_HEADER),
    ) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing tenant or user identity");
    };
    if let Err(reason) = validate(&request) {
        return error_response(StatusCode::BAD_REQUEST, reason);
    }

    let tenant_id = TenantId::new(tenant);
    let ChatRequest {
        messages,
        current_page_hint,
    } = request;

    let result = match answer(
        &state,
        tenant_id.clone(),
        user,
        transcript_of(messages),
        current_page_hint.as_deref(),
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            warn!(tenant = %tenant_id.as_str(), error = %e, "Assistant request failed");
            return error_response(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    info!(
        tenant = %tenant_id.as_str(),
        iterations = result.iterations,
        tools = result.tool_status_events.len(),
        hit_cap = result.hit_iteration_cap,
        "Assistant request complete"
    );

    let rx = SimulatedStream::from_result(result)
        .with_config(&state.stream)
        .emit();
    let stream = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(SseEvent::default().data(event.to_json())));
    Sse::new(stream).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_support::{CannedProvider, reply, test_app};
    use axum::body::Body;
    use axum::http::Request;
    use bizpilot_core::message::ContentBlock;
    use bizpilot_core::provider::StopReason;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn chat_request(body: serde_json::Value, tenant: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/assistant/chat")
            .header("content-type", "application/json");
        if let Some(tenant) = tenant {
            builder = builder.header(TENANT_HEADER, tenant).header(USER_HEADER, "u1");
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// `data:` payloads of an SSE body, in order.
    fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).unwrap())
            .collect()
    }

    #[test]
    fn validation_rules() {
        let parse = |v: serde_json::Value| serde_json::from_value::<ChatRequest>(v).unwrap();
        assert!(validate(&parse(json!({"messages": []}))).is_err());
        assert!(
            validate(&parse(json!({"messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]})))
            .is_err()
        );
        assert!(validate(&parse(json!({"messages": [{"role": "user", "content": "  "}]}))).is_err());
        assert!(validate(&parse(json!({"messages": [{"role": "user", "content": "hi"}]}))).is_ok());
        assert!(
            validate(&parse(json!({"messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "any stock left?"}
            ]})))
            .is_ok()
        );
    }

    #[test]
    fn history_must_open_with_user_and_alternate() {
        let parse = |v: serde_json::Value| serde_json::from_value::<ChatRequest>(v).unwrap();
        assert_eq!(
            validate(&parse(json!({"messages": [
                {"role": "assistant", "content": "How can I help?"},
                {"role": "user", "content": "check stock"}
            ]}))),
            Err("first message must be from the user")
        );
        assert_eq!(
            validate(&parse(json!({"messages": [
                {"role": "user", "content": "hi"},
                {"role": "user", "content": "check stock"}
            ]}))),
            Err("messages must alternate between user and assistant")
        );
        assert_eq!(
            validate(&parse(json!({"messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "assistant", "content": "anything else?"},
                {"role": "user", "content": "no"}
            ]}))),
            Err("messages must alternate between user and assistant")
        );
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let app = test_app(Arc::new(CannedProvider::new(vec![]))).await;
        let router = build_router(app.state);
        let req = chat_request(json!({"messages": [{"role": "user", "content": "hi"}]}), None);

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_messages_is_bad_request() {
        let app = test_app(Arc::new(CannedProvider::new(vec![]))).await;
        let router = build_router(app.state);
        let req = chat_request(json!({"messages": []}), Some("t1"));

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "messages must not be empty");
    }

    #[tokio::test]
    async fn assistant_first_history_is_bad_request_without_calling_provider() {
        let provider = Arc::new(CannedProvider::new(vec![]));
        let app = test_app(provider.clone()).await;
        let router = build_router(app.state);
        let req = chat_request(
            json!({"messages": [
                {"role": "assistant", "content": "Hi! How can I help?"},
                {"role": "user", "content": "check stock"}
            ]}),
            Some("t1"),
        );

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "first message must be from the user");
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let provider = Arc::new(CannedProvider::new(vec![Err(ProviderError::RateLimited {
            retry_after_secs: 30,
        })]));
        let app = test_app(provider).await;
        let router = build_router(app.state);
        let req = chat_request(
            json!({"messages": [{"role": "user", "content": "how much stock do I have?"}]}),
            Some("t1"),
        );

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Rate limited"));
    }

    #[tokio::test]
    async fn streams_statuses_then_text_then_done() {
        let provider = Arc::new(CannedProvider::new(vec![
            Ok(reply(
                StopReason::ToolUse,
                vec![ContentBlock::ToolUse {
                    id: "toolu_1".into(),
                    name: "check_stock".into(),
                    input: json!({"product": "juniper"}),
                }],
            )),
            Ok(reply(
                StopReason::EndTurn,
                vec![ContentBlock::text("Juniper Hoops: 2 left in stock.")],
            )),
        ]));
        let app = test_app(provider.clone()).await;
        let router = build_router(app.state);
        let req = chat_request(
            json!({
                "messages": [{"role": "user", "content": "How many juniper hoops are left?"}],
                "currentPageHint": "Inventory"
            }),
            Some("t1"),
        );

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let events = sse_payloads(&String::from_utf8(body.to_vec()).unwrap());

        assert_eq!(events[0], json!({"toolStatus": "Checking inventory..."}));
        assert_eq!(events.last().unwrap(), &json!({"done": true}));
        let text: String = events
            .iter()
            .filter_map(|e| e["textChunk"].as_str())
            .collect();
        assert_eq!(text, "Juniper Hoops: 2 left in stock.");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].system.contains("on the Inventory page"));
    }

    #[tokio::test]
    async fn unconfirmed_send_has_no_side_effects() {
        let provider = Arc::new(CannedProvider::new(vec![
            Ok(reply(
                StopReason::ToolUse,
                vec![ContentBlock::ToolUse {
                    id: "toolu_1".into(),
                    name: "send_message".into(),
                    input: json!({"client": "Priya", "message": "Hi {{first_name}}!", "channel": "sms"}),
                }],
            )),
            Ok(reply(
                StopReason::EndTurn,
                vec![ContentBlock::text("Here is the preview. Send it?")],
            )),
        ]));
        let app = test_app(provider).await;
        let router = build_router(app.state.clone());
        let req = chat_request(
            json!({"messages": [{"role": "user", "content": "text Priya hello"}]}),
            Some("t1"),
        );

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let _ = response.into_body().collect().await.unwrap();

        app.state.audit.flush().await;
        assert!(app.messenger.sent().await.is_empty());
        assert!(
            app.store
                .message_log(&TenantId::new("t1"))
                .await
                .is_empty()
        );
    }
}
