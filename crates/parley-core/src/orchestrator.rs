use std::sync::Arc;

use async_trait::async_trait;

use parley_types::Run;
use parley_upstream::{GatewayError, ThreadBackend};

use crate::classifier::{classify_run_failure, FailureClass};
use crate::config::FallbackSettings;
use crate::fallback::FallbackRun;

/// One way of producing an assistant reply for a thread's current state.
/// The primary strategy starts a genuine upstream run; the fallback strategy
/// synthesizes one from a stateless completion.
#[async_trait]
pub trait RunStrategy: Send + Sync {
    async fn attempt(&self, thread_id: &str) -> Result<Run, GatewayError>;
}

/// Starts a run on the thread against the configured assistant and returns
/// the upstream run record unchanged.
#[derive(Clone)]
pub struct PrimaryRun {
    backend: Arc<dyn ThreadBackend>,
    assistant_id: String,
}

impl PrimaryRun {
    pub fn new(backend: Arc<dyn ThreadBackend>, assistant_id: &str) -> Self {
        Self {
            backend,
            assistant_id: assistant_id.to_string(),
        }
    }
}

#[async_trait]
impl RunStrategy for PrimaryRun {
    async fn attempt(&self, thread_id: &str) -> Result<Run, GatewayError> {
        self.backend.start_run(thread_id, &self.assistant_id).await
    }
}

/// Try `primary`, degrade once to `fallback` on a classified-retryable
/// failure. Transport-level faults (no HTTP status available) also earn one
/// fallback attempt, but if both paths fail the PRIMARY error is surfaced so
/// the root cause stays visible. Never more than one fallback attempt.
pub async fn run_with_fallback(
    primary: &dyn RunStrategy,
    fallback: &dyn RunStrategy,
    thread_id: &str,
) -> Result<Run, GatewayError> {
    match primary.attempt(thread_id).await {
        Ok(run) => Ok(run),
        Err(GatewayError::Api { status, body }) => match classify_run_failure(status) {
            FailureClass::Retryable => {
                tracing::warn!(
                    thread_id,
                    status,
                    "assistant run failed with a server-side status, degrading to direct completion"
                );
                fallback.attempt(thread_id).await
            }
            FailureClass::Fatal => Err(GatewayError::Api { status, body }),
        },
        Err(primary_err) => {
            tracing::warn!(
                thread_id,
                error = %primary_err,
                "assistant run failed before a status was available, degrading to direct completion"
            );
            match fallback.attempt(thread_id).await {
                Ok(run) => Ok(run),
                Err(fallback_err) => {
                    tracing::warn!(
                        thread_id,
                        error = %fallback_err,
                        "direct completion fallback failed as well"
                    );
                    Err(primary_err)
                }
            }
        }
    }
}

/// The composed two-stage policy behind `runAssistant`.
pub struct RunOrchestrator {
    primary: PrimaryRun,
    fallback: FallbackRun,
}

impl RunOrchestrator {
    pub fn new(
        backend: Arc<dyn ThreadBackend>,
        assistant_id: &str,
        settings: FallbackSettings,
    ) -> Self {
        Self {
            primary: PrimaryRun::new(backend.clone(), assistant_id),
            fallback: FallbackRun::new(backend, settings),
        }
    }

    pub async fn start_run(&self, thread_id: &str) -> Result<Run, GatewayError> {
        run_with_fallback(&self.primary, &self.fallback, thread_id).await
    }
}
