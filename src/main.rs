use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use taste_bot::bot::Bot;
use taste_bot::channels::{Channel, CliChannel, TelegramChannel};
use taste_bot::config::{BotConfig, ChannelKind};
use taste_bot::conversation::{ConversationHandler, SessionManager};
use taste_bot::health::spawn_health_server;
use taste_bot::store::{JsonFileStore, TasteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC...");
        eprintln!("  or TASTE_BOT_CHANNEL=cli for a local session");
        std::process::exit(1);
    });

    eprintln!("🍃 Taste bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channel: {}", config.channel);
    eprintln!("   Data file: {}", config.data_file.display());
    match config.health_port {
        Some(port) => eprintln!("   Health: http://0.0.0.0:{port}/health"),
        None => eprintln!("   Health: disabled"),
    }
    eprintln!();

    // ── Store + conversation ─────────────────────────────────────────────
    let store: Arc<dyn TasteStore> = Arc::new(JsonFileStore::new(config.data_file.clone()));
    let sessions = Arc::new(SessionManager::new());
    let handler = ConversationHandler::new(store, sessions);

    // ── Channel ──────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.channel {
        ChannelKind::Telegram => {
            // from_env guarantees a token for this channel
            let token = config
                .telegram_token
                .as_ref()
                .context("TELEGRAM_BOT_TOKEN not set")?;
            Arc::new(
                TelegramChannel::new(token.expose_secret().to_string())
                    .with_drop_pending_updates(config.drop_pending_updates),
            )
        }
        ChannelKind::Cli => {
            eprintln!("   Type a message and press Enter. Ctrl+D to exit.\n");
            Arc::new(CliChannel::new())
        }
    };

    let _health_handle = match config.health_port {
        Some(port) => Some(
            spawn_health_server(port)
                .await
                .context("failed to start health server")?,
        ),
        None => None,
    };

    Bot::new(handler, channel, config.session_idle_timeout)
        .run()
        .await?;

    Ok(())
}
