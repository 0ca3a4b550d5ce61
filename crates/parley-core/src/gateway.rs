use std::sync::Arc;

use parley_types::{MessageRole, Run, Thread, ThreadMessage};
use parley_upstream::{GatewayError, ThreadBackend};

use crate::config::GatewayConfig;
use crate::fallback::FallbackRun;
use crate::orchestrator::{RunOrchestrator, RunStrategy};

/// The six caller-facing operations, one method each. Everything below this
/// facade is policy-free except `run_assistant`, which goes through the
/// orchestrator's degrade-once path.
pub struct ChatGateway {
    backend: Arc<dyn ThreadBackend>,
    orchestrator: RunOrchestrator,
    direct: FallbackRun,
}

impl ChatGateway {
    pub fn new(backend: Arc<dyn ThreadBackend>, config: &GatewayConfig) -> Self {
        let direct = FallbackRun::new(backend.clone(), config.fallback.clone());
        let orchestrator = RunOrchestrator::new(
            backend.clone(),
            &config.assistant_id,
            config.fallback.clone(),
        );
        Self {
            backend,
            orchestrator,
            direct,
        }
    }

    pub async fn create_thread(&self) -> Result<Thread, GatewayError> {
        self.backend.create_thread().await
    }

    pub async fn add_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<ThreadMessage, GatewayError> {
        self.backend
            .append_message(thread_id, MessageRole::User, text)
            .await
    }

    pub async fn run_assistant(&self, thread_id: &str) -> Result<Run, GatewayError> {
        self.orchestrator.start_run(thread_id).await
    }

    pub async fn messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, GatewayError> {
        self.backend.list_messages(thread_id).await
    }

    pub async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<Run, GatewayError> {
        self.backend.run_status(thread_id, run_id).await
    }

    /// Explicit direct-path entry point. A supplied message becomes the user
    /// turn first, so the executor always has something to answer.
    pub async fn run_direct(
        &self,
        thread_id: &str,
        message: Option<&str>,
    ) -> Result<Run, GatewayError> {
        if let Some(text) = message.filter(|t| !t.trim().is_empty()) {
            self.backend
                .append_message(thread_id, MessageRole::User, text)
                .await?;
        }
        self.direct.attempt(thread_id).await
    }
}
