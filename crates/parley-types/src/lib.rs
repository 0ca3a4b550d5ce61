mod run;
mod thread;

pub use run::{Run, RunStatus, TokenUsage};
pub use thread::{MessageRole, Thread, ThreadMessage};
