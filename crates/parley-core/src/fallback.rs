use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use parley_types::{MessageRole, Run, RunStatus, TokenUsage};
use parley_upstream::{CompletionRequest, GatewayError, ThreadBackend};

use crate::classifier::is_quota_exhausted;
use crate::config::FallbackSettings;
use crate::orchestrator::RunStrategy;

/// Sentinel assistant id on synthesized runs. The only way a caller can tell
/// a fallback-served turn from a genuine run.
pub const FALLBACK_ASSISTANT_ID: &str = "fallback";

// Disambiguates ids minted within the same millisecond.
static SYNTHETIC_RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// The stateless completion path: recover the last user utterance from the
/// thread, answer it under the fixed persona, write the reply back, and
/// present the result as an already-completed run.
#[derive(Clone)]
pub struct FallbackRun {
    backend: Arc<dyn ThreadBackend>,
    settings: FallbackSettings,
}

impl FallbackRun {
    pub fn new(backend: Arc<dyn ThreadBackend>, settings: FallbackSettings) -> Self {
        Self { backend, settings }
    }

    fn synthesize_run(&self, thread_id: &str, usage: Option<TokenUsage>) -> Run {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let seq = SYNTHETIC_RUN_SEQ.fetch_add(1, Ordering::Relaxed);
        Run {
            id: format!("fallback_{now_ms}_{seq}"),
            status: RunStatus::Completed,
            thread_id: thread_id.to_string(),
            assistant_id: FALLBACK_ASSISTANT_ID.to_string(),
            created_at: (now_ms / 1000) as i64,
            model: Some(self.settings.model.clone()),
            usage,
        }
    }
}

#[async_trait]
impl RunStrategy for FallbackRun {
    async fn attempt(&self, thread_id: &str) -> Result<Run, GatewayError> {
        let messages = self.backend.list_messages(thread_id).await?;
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or(GatewayError::NoUserMessage)?;

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: self.settings.persona.clone(),
            user_text: last_user.content.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let reply = match self.backend.chat_completion(&request).await {
            Ok(reply) => reply,
            Err(GatewayError::Api { status, body }) if is_quota_exhausted(status, &body) => {
                return Err(GatewayError::QuotaExhausted);
            }
            Err(err) => return Err(err),
        };

        // Best-effort write-back: the caller still gets the reply even when
        // the thread append fails.
        if let Err(err) = self
            .backend
            .append_message(thread_id, MessageRole::Assistant, &reply.text)
            .await
        {
            tracing::warn!(
                thread_id,
                error = %err,
                "failed to append fallback reply to thread"
            );
        }

        Ok(self.synthesize_run(thread_id, reply.usage))
    }
}
