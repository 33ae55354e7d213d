//! Recording fakes for the outbound service ports.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use meal_builder_core::domain::{ExternalIdentity, IncomingMessage};
use meal_builder_core::ports::{
    ChatBotService, IdentityProvider, ImageStorageService, PortError, PortResult,
};

/// A message the bot sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub markdown: bool,
}

/// Serves queued batches of incoming messages and records every reply.
#[derive(Default)]
pub struct RecordingChat {
    batches: Mutex<VecDeque<PortResult<Vec<IncomingMessage>>>>,
    offsets: Mutex<Vec<i64>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, batch: Vec<IncomingMessage>) {
        lock(&self.batches).push_back(Ok(batch));
    }

    pub fn push_error(&self, message: &str) {
        lock(&self.batches).push_back(Err(PortError::Unexpected(message.to_owned())));
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    /// The offsets passed to each poll, in order.
    pub fn offsets(&self) -> Vec<i64> {
        lock(&self.offsets).clone()
    }
}

#[async_trait]
impl ChatBotService for RecordingChat {
    async fn poll_messages(
        &self,
        offset: i64,
        _timeout_secs: u64,
    ) -> PortResult<Vec<IncomingMessage>> {
        lock(&self.offsets).push(offset);
        let next = lock(&self.batches).pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Behave like an idle long poll.
                tokio::task::yield_now().await;
                Ok(Vec::new())
            }
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str, markdown: bool) -> PortResult<()> {
        lock(&self.sent).push(SentMessage {
            chat_id,
            text: text.to_owned(),
            markdown,
        });
        Ok(())
    }
}

/// Pretends to host images under `https://images.test/<file name>`.
#[derive(Default)]
pub struct FakeImageStorage {
    uploads: Mutex<Vec<(String, usize)>>,
}

impl FakeImageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(file name, byte count)` of every upload.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl ImageStorageService for FakeImageStorage {
    async fn upload(
        &self,
        file_name: &str,
        _content_type: Option<&str>,
        data: Vec<u8>,
    ) -> PortResult<String> {
        lock(&self.uploads).push((file_name.to_owned(), data.len()));
        Ok(format!("https://images.test/{file_name}"))
    }
}

/// Accepts the code `"good-code"` and asserts a fixed identity for it.
pub struct FakeIdentityProvider {
    pub identity: ExternalIdentity,
}

impl Default for FakeIdentityProvider {
    fn default() -> Self {
        Self {
            identity: ExternalIdentity {
                provider: "google".into(),
                subject: "subject-1".into(),
                email: "cook@example.com".into(),
                name: Some("Cook".into()),
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.test/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> PortResult<ExternalIdentity> {
        if code == "good-code" {
            Ok(self.identity.clone())
        } else {
            Err(PortError::Unauthorized)
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
