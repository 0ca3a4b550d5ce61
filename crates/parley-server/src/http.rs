use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use parley_core::QUOTA_MARKER;
use parley_upstream::GatewayError;

use crate::AppState;

/// The closed set of widget actions. An unrecognized `action` fails
/// deserialization and maps to 400, so nothing reaches the gateway unmatched.
#[derive(Debug, Deserialize)]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
enum ChatAction {
    CreateThread,
    AddMessage {
        thread_id: String,
        message: String,
    },
    RunAssistant {
        thread_id: String,
    },
    GetMessages {
        thread_id: String,
    },
    CheckRunStatus {
        thread_id: String,
        run_id: String,
    },
    RunDirectChat {
        thread_id: String,
        #[serde(default)]
        message: Option<String>,
    },
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/config", get(client_config))
        .route("/chat", post(chat_action))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Non-secret tunables the browser widget reads at startup: which model the
/// direct path answers with, and how hard the widget may poll.
async fn client_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "model": state.config.fallback.model,
        "pacing": state.config.pacing,
    }))
}

async fn chat_action(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let action: ChatAction = match serde_json::from_value(body) {
        Ok(action) => action,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid action", "detail": err.to_string() })),
            )
                .into_response();
        }
    };
    let Some(gateway) = state.gateway.as_ref() else {
        tracing::error!("action rejected: no upstream API key configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "upstream API key not configured" })),
        )
            .into_response();
    };

    let result = match action {
        ChatAction::CreateThread => gateway.create_thread().await.map(|thread| json!(thread)),
        ChatAction::AddMessage { thread_id, message } => gateway
            .add_message(&thread_id, &message)
            .await
            .map(|message| json!(message)),
        ChatAction::RunAssistant { thread_id } => gateway
            .run_assistant(&thread_id)
            .await
            .map(|run| json!(run)),
        ChatAction::GetMessages { thread_id } => gateway
            .messages(&thread_id)
            .await
            .map(|messages| json!({ "data": messages })),
        ChatAction::CheckRunStatus { thread_id, run_id } => gateway
            .run_status(&thread_id, &run_id)
            .await
            .map(|run| json!(run)),
        ChatAction::RunDirectChat { thread_id, message } => gateway
            .run_direct(&thread_id, message.as_deref())
            .await
            .map(|run| json!(run)),
    };

    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

fn error_response(err: GatewayError) -> (StatusCode, Json<Value>) {
    match err {
        GatewayError::Api { status, body } => {
            tracing::error!(status, "upstream call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "upstream error", "status": status, "detail": body })),
            )
        }
        GatewayError::QuotaExhausted => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": QUOTA_MARKER })),
        ),
        GatewayError::NoUserMessage => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "no user message found for this thread" })),
        ),
        GatewayError::Transport(detail) | GatewayError::Malformed(detail) => {
            tracing::error!(detail = %detail, "upstream transport failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error", "detail": detail })),
            )
        }
    }
}
