use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::{MessageSender, TelegramError, UpdateSource};
use super::types::Update;

/// Records outgoing messages; fails every send while `fail` is set
#[derive(Default)]
pub(crate) struct RecordingSender {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub fail: AtomicBool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        let sender = Self::default();
        sender.fail.store(true, Ordering::SeqCst);
        sender
    }

    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TelegramError::Api {
                code: Some(403),
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Serves scripted getUpdates batches, then errors once the script runs out
#[derive(Default)]
pub(crate) struct ScriptedUpdates {
    pub batches: Mutex<VecDeque<Result<Vec<Update>, TelegramError>>>,
    pub offsets: Mutex<Vec<Option<i64>>>,
}

#[async_trait]
impl UpdateSource for ScriptedUpdates {
    async fn get_updates(&self, offset: Option<i64>, _timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TelegramError::Transport("script exhausted".to_string())))
    }
}
