/// Body marker the upstream includes when a 429 means the account is out of
/// quota rather than merely rate-limited.
pub const QUOTA_MARKER: &str = "insufficient_quota";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth exactly one fallback attempt through the completion path.
    Retryable,
    /// Surfaced to the caller unchanged; no fallback.
    Fatal,
}

/// Classify a failed run-start attempt. Pure function of the status code;
/// the response body is carried along for diagnostics only.
pub fn classify_run_failure(status: u16) -> FailureClass {
    if status >= 500 {
        FailureClass::Retryable
    } else {
        FailureClass::Fatal
    }
}

/// Quota-exhaustion check used by the fallback executor for its completion
/// call. Independent of `classify_run_failure`: this is the only place the
/// body participates in a classification.
pub fn is_quota_exhausted(status: u16, body: &str) -> bool {
    status == 429 && body.contains(QUOTA_MARKER)
}
