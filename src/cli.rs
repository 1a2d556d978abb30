//! Command-line interface for nebula_sage.

use clap::{Parser, Subcommand};
use nebula_sage::Cue;
use std::path::PathBuf;

/// Nebula Sage - guess the number the oracle is hiding
#[derive(Parser, Debug)]
#[command(name = "nebula_sage")]
#[command(about = "A number guessing game narrated by a cosmic oracle", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play in the terminal
    Play {
        /// Path to configuration file
        #[arg(short, long, default_value = nebula_sage::DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Never contact the model; use fallback lines only
        #[arg(long)]
        offline: bool,

        /// Disable cues, ambience and narration
        #[arg(long)]
        mute: bool,

        /// Seed for targets and ambience
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play games headlessly with a bisection strategy
    Simulate {
        /// Number of games
        #[arg(short, long, default_value = "10")]
        games: usize,

        /// Seed for targets
        #[arg(long)]
        seed: Option<u64>,

        /// Path to configuration file
        #[arg(short, long, default_value = nebula_sage::DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Never contact the model
        #[arg(long)]
        offline: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a single sound cue
    Cue {
        /// Cue name (scan, sage_intro, hint_high, hint_low, victory, game_over, reset)
        cue: Cue,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(long, default_value = nebula_sage::DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
