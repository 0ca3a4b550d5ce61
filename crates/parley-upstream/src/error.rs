use thiserror::Error;

/// Failure taxonomy shared by the client and the run orchestration layer.
///
/// `Api` carries the raw status and body so the orchestrator can classify
/// the failure; `QuotaExhausted` and `NoUserMessage` are produced by the
/// fallback executor, never by the client itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("upstream quota exhausted (insufficient_quota)")]
    QuotaExhausted,

    #[error("no user message available to answer")]
    NoUserMessage,

    #[error("upstream transport failure: {0}")]
    Transport(String),

    #[error("upstream returned an unexpected payload: {0}")]
    Malformed(String),
}

impl GatewayError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}
