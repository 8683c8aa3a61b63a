use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-transcripts",
    about = "Extract video transcripts with multi-provider fallback",
    version,
    long_about = "Fetches text transcripts for a video from several independent providers \
(official Data API, timedtext caption tracks, the InnerTube player endpoint, and dedicated \
transcript services), trying them in order until one succeeds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a transcript for a video URL or ID
    Get {
        /// Video URL or bare video ID
        #[arg(value_name = "URL_OR_ID")]
        video: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Preferred transcript language (BCP-47 tag)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Country hint for region-restricted lookups
        #[arg(long, value_name = "COUNTRY")]
        country: Option<String>,

        /// Use exactly this provider, with no fallback
        #[arg(short, long, value_name = "PROVIDER", conflicts_with = "prefer")]
        provider: Option<String>,

        /// Try this provider first (repeatable; remaining providers still follow)
        #[arg(long, value_name = "PROVIDER")]
        prefer: Vec<String>,

        /// Overall deadline for the request in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Include segment timestamps in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// List registered providers and their availability
    Providers,

    /// Report aggregate provider health
    Health,

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
        }
    }
}
