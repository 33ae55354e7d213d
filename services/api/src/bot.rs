//! services/api/src/bot.rs
//!
//! The chat bot: a long-poll loop that answers `/plan <id>` requests with the
//! rendered weekly grid of that meal plan.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use meal_builder_core::chat::{
    self, BotCommand, HELP_TEXT, MESSAGE_LIMIT, PLAN_USAGE_TEXT, WELCOME_TEXT,
};
use meal_builder_core::domain::{DayOfWeek, IncomingMessage};
use meal_builder_core::planner;
use meal_builder_core::ports::{ChatBotService, DatabaseService, PortResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Seconds the server holds each `getUpdates` request open.
pub const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct ChatBot {
    db: Arc<dyn DatabaseService>,
    chat: Arc<dyn ChatBotService>,
    week_start: DayOfWeek,
    backoff: Duration,
}

impl ChatBot {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        chat: Arc<dyn ChatBotService>,
        week_start: DayOfWeek,
    ) -> Self {
        Self {
            db,
            chat,
            week_start,
            backoff: ERROR_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs until `cancel` fires. Each message is answered completely before
    /// the next poll, and a failing message never stops the loop.
    pub async fn run(self, cancel: CancellationToken) {
        info!("Chat bot polling started");
        let updates = incoming(self.chat.clone(), cancel, self.backoff);
        futures::pin_mut!(updates);

        while let Some(message) = updates.next().await {
            if let Err(e) = self.handle_message(&message).await {
                error!(
                    "Failed to handle chat update {}: {:?}",
                    message.update_id, e
                );
            }
        }
        info!("Chat bot polling stopped");
    }

    /// Answers a single message. Messages without text are ignored.
    pub async fn handle_message(&self, message: &IncomingMessage) -> PortResult<()> {
        let Some(text) = message.text.as_deref().map(str::trim) else {
            return Ok(());
        };
        let chat_id = message.chat_id;

        match BotCommand::parse(text) {
            BotCommand::ShowPlan(id) => self.send_plan(chat_id, id).await,
            BotCommand::PlanUsage => self.chat.send_message(chat_id, PLAN_USAGE_TEXT, true).await,
            BotCommand::Welcome => self.chat.send_message(chat_id, WELCOME_TEXT, true).await,
            BotCommand::Help => self.chat.send_message(chat_id, HELP_TEXT, true).await,
        }
    }

    async fn send_plan(&self, chat_id: i64, meal_plan_id: i64) -> PortResult<()> {
        let grid = planner::load_public_grid(self.db.as_ref(), meal_plan_id, self.week_start).await?;
        let Some(grid) = grid else {
            let text = chat::plan_not_found_text(meal_plan_id);
            return self.chat.send_message(chat_id, &text, false).await;
        };

        let rendered = chat::render_plan(&grid);
        for chunk in chat::split_message(&rendered, MESSAGE_LIMIT) {
            self.chat.send_message(chat_id, &chunk, true).await?;
        }
        Ok(())
    }
}

/// Long-polls the chat service and yields messages one at a time. The offset
/// only moves past an update once the consumer has asked for the next item,
/// so a batch is fully handled before it is acknowledged.
fn incoming(
    chat: Arc<dyn ChatBotService>,
    cancel: CancellationToken,
    backoff: Duration,
) -> impl Stream<Item = IncomingMessage> {
    stream! {
        let mut offset = 0_i64;
        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                polled = chat.poll_messages(offset, POLL_TIMEOUT_SECS) => polled,
            };

            match polled {
                Ok(batch) => {
                    for message in batch {
                        offset = offset.max(message.update_id + 1);
                        yield message;
                    }
                }
                Err(e) => {
                    warn!("Polling the chat service failed: {:?}", e);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}
