//! Main bot loop: pulls messages from the channel one at a time, runs the
//! conversation, sends replies back in order.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::channels::{Channel, IncomingMessage};
use crate::conversation::ConversationHandler;
use crate::error::Error;

/// How often idle sessions are swept.
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

pub struct Bot {
    handler: ConversationHandler,
    channel: Arc<dyn Channel>,
    session_idle_timeout: Duration,
}

impl Bot {
    pub fn new(
        handler: ConversationHandler,
        channel: Arc<dyn Channel>,
        session_idle_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            channel,
            session_idle_timeout,
        }
    }

    /// Run until Ctrl+C or until the channel stream ends.
    pub async fn run(self) -> Result<(), Error> {
        if let Err(e) = self.channel.health_check().await {
            tracing::warn!("Channel {} health check failed: {e}", self.channel.name());
        }

        let mut message_stream = self.channel.start().await?;

        // Spawn session pruning task
        let sessions = Arc::clone(self.handler.sessions());
        let idle_timeout = self.session_idle_timeout;
        let pruning_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PRUNE_INTERVAL);
            interval.tick().await; // Skip immediate first tick
            loop {
                interval.tick().await;
                sessions.prune_stale_sessions(idle_timeout).await;
            }
        });

        tracing::info!("Bot ready on channel {}", self.channel.name());

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            self.process(&message).await;
        }

        pruning_handle.abort();
        self.channel.shutdown().await?;

        Ok(())
    }

    /// Handle one message and deliver its replies. Send failures are logged;
    /// the user never sees them.
    pub async fn process(&self, message: &IncomingMessage) {
        for response in self.handler.handle(message).await {
            if let Err(e) = self.channel.respond(message, response).await {
                tracing::error!(user_id = %message.user_id, "Failed to send reply: {e}");
                break;
            }
        }
    }
}
