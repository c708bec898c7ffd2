//! Command-line interface for fzmahjong.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FZMahjong - text client for Fuzhou mahjong rooms
#[derive(Parser, Debug)]
#[command(name = "fzmahjong")]
#[command(about = "Text client for Fuzhou mahjong rooms", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join a room (creating one if no room is given) and play
    Play {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Room id to join; omit to create a new room
        #[arg(short, long)]
        room: Option<String>,
    },

    /// Rejoin the saved room with the saved identity
    Restore {
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },

    /// Forget the saved session
    Forget,

    /// Create a room and print its id
    CreateRoom,
}
