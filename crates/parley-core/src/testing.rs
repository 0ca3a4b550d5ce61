//! In-memory `ThreadBackend` used by the core tests. Threads live in a map,
//! run-start and completion outcomes are scripted per test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use parley_types::{MessageRole, Run, RunStatus, Thread, ThreadMessage};
use parley_upstream::{CompletionReply, CompletionRequest, GatewayError, ThreadBackend};

pub(crate) enum FakeResult<T> {
    Ok(T),
    Api { status: u16, body: String },
    Transport(String),
}

impl<T> FakeResult<T> {
    fn into_result(self) -> Result<T, GatewayError> {
        match self {
            FakeResult::Ok(value) => Ok(value),
            FakeResult::Api { status, body } => Err(GatewayError::Api { status, body }),
            FakeResult::Transport(message) => Err(GatewayError::Transport(message)),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    threads: Mutex<HashMap<String, Vec<ThreadMessage>>>,
    run_outcome: Mutex<Option<FakeResult<Run>>>,
    completion_outcome: Mutex<Option<FakeResult<CompletionReply>>>,
    last_completion_user_text: Mutex<Option<String>>,
    completion_calls: AtomicUsize,
    fail_next_append: AtomicBool,
    next_id: AtomicU64,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seed_thread(&self, turns: &[(MessageRole, &str)]) -> String {
        let thread_id = format!("thread_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let messages = turns
            .iter()
            .map(|(role, content)| self.make_message(*role, content))
            .collect();
        self.threads
            .lock()
            .expect("threads lock")
            .insert(thread_id.clone(), messages);
        thread_id
    }

    pub(crate) fn script_run(&self, outcome: FakeResult<Run>) {
        *self.run_outcome.lock().expect("run lock") = Some(outcome);
    }

    pub(crate) fn script_completion(&self, outcome: FakeResult<CompletionReply>) {
        *self.completion_outcome.lock().expect("completion lock") = Some(outcome);
    }

    pub(crate) fn script_completion_text(&self, text: &str) {
        self.script_completion(FakeResult::Ok(CompletionReply {
            text: text.to_string(),
            usage: None,
        }));
    }

    pub(crate) fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::Relaxed);
    }

    pub(crate) fn upstream_run(&self, id: &str, thread_id: &str) -> Run {
        Run {
            id: id.to_string(),
            status: RunStatus::Queued,
            thread_id: thread_id.to_string(),
            assistant_id: "asst_1".to_string(),
            created_at: 1_700_000_000,
            model: Some("gpt-4o".to_string()),
            usage: None,
        }
    }

    pub(crate) fn messages_of(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.threads
            .lock()
            .expect("threads lock")
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn message_count(&self, thread_id: &str) -> usize {
        self.messages_of(thread_id).len()
    }

    pub(crate) fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn last_completion_user_text(&self) -> Option<String> {
        self.last_completion_user_text
            .lock()
            .expect("user text lock")
            .clone()
    }

    fn make_message(&self, role: MessageRole, content: &str) -> ThreadMessage {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        ThreadMessage {
            id: format!("msg_{seq}"),
            role,
            content: content.to_string(),
            created_at: seq as i64,
        }
    }
}

#[async_trait]
impl ThreadBackend for FakeBackend {
    async fn create_thread(&self) -> Result<Thread, GatewayError> {
        let thread_id = self.seed_thread(&[]);
        Ok(Thread {
            id: thread_id,
            created_at: 1_700_000_000,
        })
    }

    async fn append_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage, GatewayError> {
        if self.fail_next_append.swap(false, Ordering::Relaxed) {
            return Err(GatewayError::Api {
                status: 500,
                body: "message store offline".to_string(),
            });
        }
        let message = self.make_message(role, content);
        let mut threads = self.threads.lock().expect("threads lock");
        let messages = threads.get_mut(thread_id).ok_or_else(|| GatewayError::Api {
            status: 404,
            body: format!("thread {thread_id} not found"),
        })?;
        messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, GatewayError> {
        let threads = self.threads.lock().expect("threads lock");
        threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                body: format!("thread {thread_id} not found"),
            })
    }

    async fn start_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<Run, GatewayError> {
        self.run_outcome
            .lock()
            .expect("run lock")
            .take()
            .expect("test did not script a run outcome")
            .into_result()
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<Run, GatewayError> {
        Ok(Run {
            id: run_id.to_string(),
            status: RunStatus::InProgress,
            thread_id: thread_id.to_string(),
            assistant_id: "asst_1".to_string(),
            created_at: 1_700_000_000,
            model: None,
            usage: None,
        })
    }

    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionReply, GatewayError> {
        self.completion_calls.fetch_add(1, Ordering::Relaxed);
        *self
            .last_completion_user_text
            .lock()
            .expect("user text lock") = Some(request.user_text.clone());
        self.completion_outcome
            .lock()
            .expect("completion lock")
            .take()
            .expect("test did not script a completion outcome")
            .into_result()
    }
}
