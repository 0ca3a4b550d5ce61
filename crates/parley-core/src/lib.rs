//! Run orchestration for the Parley gateway: attempt an assistant run,
//! classify failures, and degrade once to a stateless completion whose
//! result is reconciled back into the thread.

mod classifier;
mod config;
mod fallback;
mod gateway;
mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{classify_run_failure, is_quota_exhausted, FailureClass, QUOTA_MARKER};
pub use config::{ClientPacing, FallbackSettings, GatewayConfig, DEFAULT_BASE_URL};
pub use fallback::{FallbackRun, FALLBACK_ASSISTANT_ID};
pub use gateway::ChatGateway;
pub use orchestrator::{run_with_fallback, PrimaryRun, RunOrchestrator, RunStrategy};
