use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use votekick::channels::{run_long_polling, TelegramClient};
use votekick::cli::{self, Cli, Command, ConfigCommand};
use votekick::config;
use votekick::logging;
use votekick::moderation::{BanSink, ModerationBot};
use votekick::polls::{PollEngine, PollRegistry};
use votekick::settings::SettingsStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Run) => run().await,
        Some(Command::Config(ConfigCommand::Show)) => cli::handle_config_show(),
        Some(Command::Config(ConfigCommand::Path)) => {
            cli::handle_config_path();
            Ok(())
        }
        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    logging::init_logging(&cfg.logging)?;
    cfg.validate()?;

    let client = Arc::new(TelegramClient::new(cfg.telegram.clone())?);
    let me = client.get_me().await?;
    info!(bot_id = me.id, username = ?me.username, "connected to Telegram");

    let settings = Arc::new(SettingsStore::open(cfg.settings_file())?);

    let sink = Arc::new(BanSink::new(client.clone()));
    let engine = Arc::new(
        PollEngine::new(Arc::new(PollRegistry::new()), sink)
            .with_default_policy(cfg.polls.default_policy),
    );

    let mut failures = engine.subscribe_failures();
    tokio::spawn(async move {
        while let Ok(failure) = failures.recv().await {
            warn!(
                poll = %failure.key,
                subject = failure.subject_id,
                outcome = ?failure.outcome,
                error = %failure.error,
                "moderation action was not carried out"
            );
        }
    });

    let mut bot = ModerationBot::new(
        client.clone(),
        engine.clone(),
        settings,
        cfg.polls.vote_duration(),
    );
    if let Some(username) = me.username {
        bot = bot.with_username(username);
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    run_long_polling(client, Arc::new(bot), shutdown).await;

    for key in engine.registry().keys() {
        warn!(poll = %key, "poll still open at shutdown, it will not be resolved");
    }

    let stats = engine.stats();
    info!(
        active_polls = stats.active_polls,
        opened = stats.opened,
        resolved = stats.resolved,
        actions_taken = stats.actions_taken,
        sink_failures = stats.sink_failures,
        "votekick stopped"
    );
    Ok(())
}
