//! Kino Playback CLI - Headless walkthroughs of the playback controller
//!
//! Features:
//! - Session startup against a simulated adaptive engine
//! - Direct-playback fallback for progressive sources
//! - Fatal error injection and recovery reporting
//! - Quality request resolution
//! - Ladder ranking breakdown

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

mod commands;
mod output;

/// Kino Playback CLI - Playback lifecycle toolkit
#[derive(Parser)]
#[command(name = "kino-playback")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Drive the Kino playback controller against a simulated engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and show where it settles
    Play {
        /// Source URL (manifest or media file)
        #[arg(default_value = "")]
        src: String,

        /// Start playback once the manifest is parsed
        #[arg(short, long)]
        autoplay: bool,

        /// Read player props from a JSON file
        #[arg(short, long)]
        props: Option<PathBuf>,

        /// Ladder as height:bitrate pairs, comma separated
        #[arg(short, long)]
        ladder: Option<String>,

        /// Simulate an environment without adaptive streaming support
        #[arg(long)]
        unsupported: bool,

        /// Refuse play() as if no user gesture happened yet
        #[arg(long)]
        block_autoplay: bool,
    },

    /// Inject engine errors and show the recovery
    Fail {
        /// Manifest URL
        src: String,

        /// Error type (network, media, key-system, mux, other)
        #[arg(short, long, default_value = "network")]
        kind: String,

        /// Number of errors to inject
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Report the errors as non-fatal
        #[arg(long)]
        non_fatal: bool,

        /// Give up after this many consecutive reinitializations
        #[arg(long)]
        reinit_limit: Option<u32>,

        /// Ladder as height:bitrate pairs, comma separated
        #[arg(short, long)]
        ladder: Option<String>,
    },

    /// Request a quality and show the engine level it selects
    Quality {
        /// Manifest URL
        src: String,

        /// Height in pixels, or "auto"
        #[arg(short = 'H', long, default_value = "auto")]
        height: String,

        /// Ladder as height:bitrate pairs, comma separated
        #[arg(short, long)]
        ladder: Option<String>,
    },

    /// Show how a ladder is ranked and exposed as qualities
    Ladder {
        /// Ladder as height:bitrate pairs, comma separated
        ladder: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::Play { src, autoplay, props, ladder, unsupported, block_autoplay } => {
            if src.is_empty() && props.is_none() {
                anyhow::bail!("a source URL or --props file is required");
            }
            commands::play(&src, autoplay, props, ladder, unsupported, block_autoplay, format).await?;
        }
        Commands::Fail { src, kind, count, non_fatal, reinit_limit, ladder } => {
            commands::fail(&src, &kind, count, non_fatal, reinit_limit, ladder, format).await?;
        }
        Commands::Quality { src, height, ladder } => {
            commands::quality(&src, &height, ladder, format).await?;
        }
        Commands::Ladder { ladder } => {
            commands::ladder(&ladder, format)?;
        }
    }

    tracing::debug!("Done");

    Ok(())
}
