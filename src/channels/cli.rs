//! CLI channel: stdin/stdout REPL for local testing.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, ReplyKeyboard};
use crate::error::ChannelError;

/// A simple CLI channel that reads from stdin and writes to stdout.
///
/// Every line comes from the same local user.
pub struct CliChannel {
    user_id: String,
    user_name: String,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            user_id: "local-user".to_string(),
            user_name: "friend".to_string(),
        }
    }

    pub fn with_user(mut self, user_id: &str, user_name: &str) -> Self {
        self.user_id = user_id.to_string();
        self.user_name = user_name.to_string();
        self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id.clone();
        let user_name = self.user_name.clone();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg =
                            IncomingMessage::new("cli", &user_id, &line).with_user_name(&user_name);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}", render(&response));
        eprint!("> ");
        Ok(())
    }
}

/// Text followed by the keyboard, one bracketed button per row.
fn render(response: &OutgoingResponse) -> String {
    match &response.keyboard {
        Some(keyboard) => format!("{}\n{}", response.content, render_keyboard(keyboard)),
        None => response.content.clone(),
    }
}

fn render_keyboard(keyboard: &ReplyKeyboard) -> String {
    keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|label| format!("[{label}]"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_channel_name() {
        assert_eq!(CliChannel::new().name(), "cli");
    }

    #[test]
    fn render_plain_text() {
        assert_eq!(render(&OutgoingResponse::text("hello")), "hello");
    }

    #[test]
    fn render_keyboard_rows() {
        let response = OutgoingResponse::text("menu")
            .with_keyboard(ReplyKeyboard::new([vec!["a", "b"], vec!["c"]]));
        assert_eq!(render(&response), "menu\n[a] [b]\n[c]");
    }
}
