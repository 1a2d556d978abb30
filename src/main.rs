//! Nebula Sage - Unified CLI
//!
//! Interactive play, headless simulation and audio previews.

#![warn(missing_docs)]

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use cli::{Cli, Command};
use nebula_sage::audio::SilentSink;
use nebula_sage::{
    Cue, FeedbackCollaborator, LlmClient, OfflineSage, SageConfig, SageOracle, SoundBoard,
    SpeechSynthesizer, simulate, tui,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            offline,
            mute,
            seed,
        } => run_play(&config, offline, mute, seed).await,
        Command::Simulate {
            games,
            seed,
            config,
            offline,
            json,
        } => run_simulate(&config, games, seed, offline, json).await,
        Command::Cue { cue } => run_cue(cue).await,
        Command::InitConfig { path, force } => run_init_config(&path, force),
    }
}

/// Run the interactive game
async fn run_play(config: &Path, offline: bool, mute: bool, seed: Option<u64>) -> Result<()> {
    tui::init_file_logging(tui::LOG_FILE)?;

    let mut config = SageConfig::load_or_default(config)?;
    if mute {
        config = config.muted();
    }

    let (sage, voice) = build_sage(&config, offline);
    let voice = voice.filter(|_| *config.narration() && *config.audio());
    let sounds = build_sound_board(&config);

    tui::run_tui(*config.max_attempts(), sage, voice, sounds, seed).await
}

/// Run headless games
#[instrument(skip_all, fields(games = games, offline = offline))]
async fn run_simulate(
    config: &Path,
    games: usize,
    seed: Option<u64>,
    offline: bool,
    json: bool,
) -> Result<()> {
    initialize_stderr_tracing();

    let config = SageConfig::load_or_default(config)?;
    let (sage, _) = build_sage(&config, offline);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = simulate::run(games, *config.max_attempts(), &mut rng, sage.as_ref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for game in report.games() {
            let guesses = game
                .guesses()
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(" → ");
            println!("target {:>3}  {:<10} {}", game.target(), game.status(), guesses);
        }
        println!(
            "{} won, {} lost, mean {:.2} guesses, worst {}",
            report.wins(),
            report.losses(),
            report.mean_guesses(),
            report.max_guesses()
        );
    }
    Ok(())
}

/// Play one cue and wait for it to finish
async fn run_cue(cue: Cue) -> Result<()> {
    initialize_stderr_tracing();

    let config = SageConfig::default();
    let sounds = build_sound_board(&config);
    let samples = cue.render(nebula_sage::audio::SAMPLE_RATE);
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    println!(
        "{cue}: {:.2}s, {} samples, peak {:.3}",
        cue.duration(),
        samples.len(),
        peak
    );

    sounds.play_cue(cue);
    tokio::time::sleep(std::time::Duration::from_secs_f32(cue.duration() + 0.2)).await;
    Ok(())
}

/// Write the default configuration
fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    std::fs::write(path, SageConfig::default().to_toml()?)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Builds the Sage, degrading to offline play when no credentials exist.
#[instrument(skip(config))]
fn build_sage(
    config: &SageConfig,
    offline: bool,
) -> (
    Arc<dyn FeedbackCollaborator>,
    Option<Arc<dyn SpeechSynthesizer>>,
) {
    if offline {
        info!("Offline mode requested");
        return (Arc::new(OfflineSage), None);
    }

    match config.create_llm_config() {
        Ok(llm_config) => {
            let oracle = Arc::new(SageOracle::new(
                LlmClient::new(llm_config),
                config.retry().clone(),
            ));
            let sage: Arc<dyn FeedbackCollaborator> = oracle.clone();
            let voice: Arc<dyn SpeechSynthesizer> = oracle;
            (sage, Some(voice))
        }
        Err(e) => {
            warn!(error = %e, "No credentials, playing offline");
            (Arc::new(OfflineSage), None)
        }
    }
}

/// Opens the speaker when sound is enabled and available.
fn build_sound_board(config: &SageConfig) -> SoundBoard {
    if !*config.audio() {
        debug!("Audio disabled by config");
        return SoundBoard::new(Arc::new(SilentSink));
    }

    #[cfg(feature = "audio")]
    {
        match nebula_sage::audio::SpeakerSink::open() {
            Ok(sink) => return SoundBoard::new(Arc::new(sink)),
            Err(e) => warn!(error = %e, "No audio device, continuing silently"),
        }
    }
    #[cfg(not(feature = "audio"))]
    debug!("Built without the audio feature");

    SoundBoard::silent()
}

fn initialize_stderr_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,nebula_sage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
