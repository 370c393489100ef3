//! CLI argument definitions for bzpsp-extract

use bzpsp_common::AudioMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bzpsp-extract")]
#[command(about = "Battlezone PSP asset extractor (level packages and audio banks)")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML config file; command-line flags take precedence
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Worker threads for batch decoding (default: one per core)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Decode .LVL (BZPK) mission packages to JSON
    Lvl {
        /// Directory containing .LVL files
        #[arg(long)]
        lvl_root: PathBuf,
        /// Output directory for .json files
        #[arg(long)]
        out_root: PathBuf,
        /// Process at most this many files (0 = all)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Copy .at3 streams and unpack .bnk banks
    Audio {
        /// Path to the USRDIR/audio folder
        #[arg(long)]
        audio_root: PathBuf,
        /// Output root for extracted audio
        #[arg(long)]
        out_root: PathBuf,
        /// Extraction mode: all, at3 or bnk
        #[arg(long)]
        mode: Option<AudioMode>,
        /// Do not decode extracted VAG files to WAV
        #[arg(long)]
        no_decode_vag: bool,
    },
}
