//! modimg CLI - perceptual-hash allow/block screening for images.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use modimg_core::{HashAlgorithm, DEFAULT_SAMPLE_FRAMES};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;

use commands::check::ListOverrides;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Allowed or inconclusive
  1   General error
  2   Blocked (blocklist match)
  65  Input is not a decodable image
  66  Input file cannot be read";

#[derive(Parser)]
#[command(name = "modimg")]
#[command(author, version, about = "Perceptual-hash image moderation", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Report format for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen an image against the allowlist and blocklist, then run the remaining engines
    Check {
        /// Path to the image (GIFs are sampled frame by frame)
        #[arg(value_name = "IMAGE")]
        file: PathBuf,

        /// Allowlist file (overrides PHASH_ALLOWLIST)
        #[arg(long, value_name = "PATH")]
        allowlist: Option<PathBuf>,

        /// Blocklist file (overrides PHASH_BLOCKLIST)
        #[arg(long, value_name = "PATH")]
        blocklist: Option<PathBuf>,

        /// Maximum Hamming distance for an allowlist match; 0 means exact
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        allow_max_distance: Option<i64>,

        /// Maximum Hamming distance for a blocklist match; 0 means exact
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        block_max_distance: Option<i64>,

        /// Frames to sample from animations
        #[arg(long, value_name = "N", default_value_t = DEFAULT_SAMPLE_FRAMES)]
        sample_frames: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Only print the final verdict
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print list-file lines for the first and last sampled frame
    Hash {
        /// Path to the image
        #[arg(value_name = "IMAGE")]
        file: PathBuf,

        /// Hash algorithm (phash64, phash128, blockhash64)
        #[arg(short, long, default_value_t = HashAlgorithm::PHash64)]
        algorithm: HashAlgorithm,

        /// Frames to sample from animations
        #[arg(long, value_name = "N", default_value_t = DEFAULT_SAMPLE_FRAMES)]
        sample_frames: usize,

        /// Label to write after each fingerprint instead of the frame index
        #[arg(short, long)]
        label: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Check {
            file,
            allowlist,
            blocklist,
            allow_max_distance,
            block_max_distance,
            sample_frames,
            format,
            quiet,
        } => commands::check::execute(
            file,
            ListOverrides {
                path: allowlist,
                max_distance: allow_max_distance,
            },
            ListOverrides {
                path: blocklist,
                max_distance: block_max_distance,
            },
            sample_frames,
            format,
            quiet,
        ),
        Commands::Hash {
            file,
            algorithm,
            sample_frames,
            label,
        } => commands::hash::execute(file, algorithm, sample_frames, label),
    }
}

fn main() {
    // Missing .env is fine.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let exit = run(cli).unwrap_or_else(|err| ExitCode::from_anyhow(&err));

    if let Some(message) = &exit.message {
        eprintln!("{} {message}", "Error:".red().bold());
    }
    std::process::exit(exit.code);
}
