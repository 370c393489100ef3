/// bzpsp-extract: batch extractor for Battlezone PSP game data
///
/// Architecture:
///   lvl  .LVL mission packages → JSON object trees (bzpsp-lvl)
///   audio  .at3 copy, .bnk unpacking, VAG → WAV (bzpsp-audio)
mod audio;
mod cli;
mod lvl;
mod naming;

use anyhow::{Context, Result};
use bzpsp_common::AppConfig;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Args, Commands};

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("bzpsp={}", level).parse()?),
        )
        .init();

    tracing::debug!("bzpsp-extract v{}", env!("CARGO_PKG_VERSION"));

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Configuring worker pool")?;
    }

    match args.command {
        Commands::Lvl {
            lvl_root,
            out_root,
            limit,
        } => {
            if !lvl_root.exists() {
                tracing::error!("LVL path not found: {}", lvl_root.display());
                return Ok(ExitCode::from(2));
            }
            let limit = limit.unwrap_or(config.lvl.limit);
            let report = lvl::run(&lvl_root, &out_root, limit)?;
            Ok(if report.ok > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Audio {
            audio_root,
            out_root,
            mode,
            no_decode_vag,
        } => {
            if !audio_root.exists() {
                tracing::error!("Audio path not found: {}", audio_root.display());
                return Ok(ExitCode::from(2));
            }
            let mode = mode.unwrap_or(config.audio.mode);
            let decode_vag = config.audio.decode_vag && !no_decode_vag;
            audio::run(&audio_root, &out_root, mode, decode_vag)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
