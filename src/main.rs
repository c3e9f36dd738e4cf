use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use reply_bot::bot::ReplyBot;
use reply_bot::config::BotConfig;
use reply_bot::reddit::RedditClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Replies to Reddit comments that match a pattern.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML file with the pattern, reply, subreddit, timeout and dry_run.
    #[arg(long)]
    params: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reply_bot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match BotConfig::load(&args.params) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        user_agent = %config.credentials.user_agent(),
        subreddit = %config.params.subreddit,
        "Loaded configuration"
    );

    let client = match RedditClient::new(config.credentials) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Could not create Reddit client");
            return ExitCode::FAILURE;
        }
    };
    let bot = match ReplyBot::from_params(client, &config.params) {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                shutdown.cancel();
            }
        }
    });

    match bot.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Reply bot stopped");
            ExitCode::FAILURE
        }
    }
}
