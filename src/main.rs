//! FZMahjong - text client
//!
//! Joins a Fuzhou mahjong room and plays it from the terminal.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use fzmahjong::{ClientConfig, GameClient, JoinOutcome, ShellExit, run_shell};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument, warn};

const LOG_FILE: &str = "fzmahjong.log";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    initialize_tracing()?;

    let config = ClientConfig::load(cli.config.as_deref())?;
    info!(server_url = %config.server_url(), "Configuration loaded");
    let mut client = GameClient::from_config(config)?;

    match cli.command {
        Command::Play { name, room } => play(&mut client, &name, room.as_deref()).await,
        Command::Restore { yes } => restore(&mut client, yes).await,
        Command::Forget => {
            client.forget()?;
            println!("Saved session cleared");
            Ok(())
        }
        Command::CreateRoom => {
            let room_id = client.bootstrap().create_room().await?;
            println!("{room_id}");
            Ok(())
        }
    }
}

/// Logs go to a file so the shell keeps stdout.
fn initialize_tracing() -> Result<()> {
    let log_file = std::fs::File::create(LOG_FILE)
        .with_context(|| format!("Failed to create log file {LOG_FILE}"))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Join (or create) a room and open the shell
#[instrument(skip(client))]
async fn play<S: fzmahjong::KeyValueStorage>(
    client: &mut GameClient<S>,
    name: &str,
    room: Option<&str>,
) -> Result<()> {
    match client.join(name, room, None).await? {
        JoinOutcome::Joined { room_id } => {
            println!("Joined room {room_id} as {name}");
            finish(run_shell(client).await?);
            Ok(())
        }
        JoinOutcome::Rejected => {
            warn!("Server rejected the join");
            println!("Join rejected (room full or unknown)");
            Ok(())
        }
    }
}

/// Rejoin the saved room after asking
#[instrument(skip(client))]
async fn restore<S: fzmahjong::KeyValueStorage>(client: &mut GameClient<S>, yes: bool) -> Result<()> {
    let Some(saved) = client.saved_session() else {
        println!("No saved session");
        return Ok(());
    };

    if !yes {
        print!(
            "Restore room {} as {}? [y/N] ",
            saved.room_id(),
            saved.player_name()
        );
        std::io::stdout().flush()?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let answer = lines.next_line().await?.unwrap_or_default();
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            client.forget()?;
            println!("Saved session cleared");
            return Ok(());
        }
    }

    match client.restore().await? {
        JoinOutcome::Joined { room_id } => {
            println!("Rejoined room {room_id}");
            finish(run_shell(client).await?);
        }
        JoinOutcome::Rejected => {
            println!("Could not rejoin room {}", saved.room_id());
        }
    }
    Ok(())
}

fn finish(exit: ShellExit) {
    info!(?exit, "Shell finished");
    if exit == ShellExit::Quit {
        println!("Session saved; run `fzmahjong restore` to come back");
    }
}
