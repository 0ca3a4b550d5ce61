use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

use parley_types::{MessageRole, Run, Thread, ThreadMessage, TokenUsage};

mod error;

pub use error::GatewayError;

const OPENAI_BETA_HEADER: &str = "OpenAI-Beta";
const ASSISTANTS_BETA: &str = "assistants=v2";

/// One stateless completion request for the fallback path.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_text: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct CompletionReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Seam between the orchestration layer and the upstream API. Each call is a
/// single request/response with no retry of its own; retry and fallback
/// policy live entirely above this trait.
#[async_trait]
pub trait ThreadBackend: Send + Sync {
    async fn create_thread(&self) -> Result<Thread, GatewayError>;

    async fn append_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage, GatewayError>;

    /// Messages in append order (oldest first), regardless of how the
    /// upstream orders its listing.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, GatewayError>;

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, GatewayError>;

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<Run, GatewayError>;

    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionReply, GatewayError>;
}

/// Authenticated client for an OpenAI-compatible upstream exposing both the
/// assistants v2 thread/run resources and the chat completions endpoint.
pub struct UpstreamClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: Client::new(),
        }
    }

    fn assistants_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header(OPENAI_BETA_HEADER, ASSISTANTS_BETA)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(GatewayError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| GatewayError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl ThreadBackend for UpstreamClient {
    async fn create_thread(&self) -> Result<Thread, GatewayError> {
        self.send_json(self.assistants_request(Method::POST, "/threads"))
            .await
    }

    async fn append_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage, GatewayError> {
        let message: WireMessage = self
            .send_json(
                self.assistants_request(Method::POST, &format!("/threads/{thread_id}/messages"))
                    .json(&json!({ "role": role, "content": content })),
            )
            .await?;
        Ok(message.into())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, GatewayError> {
        let listing: WireMessageList = self
            .send_json(
                self.assistants_request(Method::GET, &format!("/threads/{thread_id}/messages")),
            )
            .await?;
        let mut messages: Vec<ThreadMessage> =
            listing.data.into_iter().map(ThreadMessage::from).collect();
        // The upstream lists newest first; callers are promised append order.
        // created_at is second-granularity, so sorting on it would scramble
        // same-second appends; the listing order itself is authoritative.
        messages.reverse();
        Ok(messages)
    }

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, GatewayError> {
        self.send_json(
            self.assistants_request(Method::POST, &format!("/threads/{thread_id}/runs"))
                .json(&json!({ "assistant_id": assistant_id })),
        )
        .await
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<Run, GatewayError> {
        self.send_json(
            self.assistants_request(Method::GET, &format!("/threads/{thread_id}/runs/{run_id}")),
        )
        .await
    }

    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionReply, GatewayError> {
        let completion: WireCompletion = self
            .send_json(
                self.client
                    .post(format!("{}/chat/completions", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&json!({
                        "model": request.model,
                        "messages": [
                            { "role": "system", "content": request.system_prompt },
                            { "role": "user", "content": request.user_text },
                        ],
                        "max_tokens": request.max_tokens,
                        "temperature": request.temperature,
                    })),
            )
            .await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GatewayError::Malformed("completion response carried no choices".to_string())
            })?;
        Ok(CompletionReply {
            text,
            usage: completion.usage,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireMessageList {
    data: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    role: MessageRole,
    #[serde(default)]
    content: WireContent,
    #[serde(default)]
    created_at: i64,
}

impl From<WireMessage> for ThreadMessage {
    fn from(message: WireMessage) -> Self {
        ThreadMessage {
            id: message.id,
            role: message.role,
            content: message.content.flatten(),
            created_at: message.created_at,
        }
    }
}

/// Assistants messages carry structured content blocks; plain strings are
/// accepted too since message-create echoes back whatever shape was sent.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Blocks(Vec<WireContentBlock>),
}

impl Default for WireContent {
    fn default() -> Self {
        WireContent::Text(String::new())
    }
}

impl WireContent {
    fn flatten(self) -> String {
        match self {
            WireContent::Text(text) => text,
            WireContent::Blocks(blocks) => blocks
                .into_iter()
                .filter_map(|block| block.text.map(|t| t.value))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireContentBlock {
    text: Option<WireTextBlock>,
}

#[derive(Debug, Deserialize)]
struct WireTextBlock {
    value: String,
}

#[derive(Debug, Deserialize)]
struct WireCompletion {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
