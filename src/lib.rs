//! yt-transcripts - Extract video transcripts with multi-provider fallback
//!
//! This library pulls text transcripts for a video from several independent
//! extraction providers (official Data API, timedtext caption tracks, the
//! InnerTube player endpoint, and dedicated transcript services), trying them
//! in a deterministic order and returning the first successful result.

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod output;
pub mod providers;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use orchestrator::{HealthReport, TranscriptOrchestrator};
pub use providers::{
    ProviderId, Transcript, TranscriptProvider, TranscriptRequest, TranscriptSegment,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Error taxonomy for transcript extraction
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    /// The request carried neither a video ID nor a URL; no provider was contacted.
    #[error("request must include a video ID or a video URL")]
    InvalidVideoId,

    /// A URL matched no known pattern and is not a bare valid video ID.
    #[error("cannot resolve a video ID from URL: {0}")]
    UnresolvableUrl(String),

    /// No provider could be contacted: empty registry, unknown provider name,
    /// or every registered provider reported unavailable.
    #[error("no transcript provider is available")]
    ProviderNotAvailable,

    /// Every provider was contacted but none produced a transcript.
    #[error("all transcript providers failed")]
    AllProvidersFailed,

    #[error("no transcript found for video {0}")]
    TranscriptNotFound(String),

    #[error("transcripts are disabled for video {0}")]
    TranscriptDisabled(String),

    #[error("rate limit exceeded on provider {0}")]
    RateLimitExceeded(ProviderId),

    #[error("authentication failed for provider {0}")]
    AuthenticationFailed(ProviderId),

    /// Any other provider failure, tagged with the provider that produced it.
    #[error("provider {provider} failed: {source}")]
    Provider {
        provider: ProviderId,
        #[source]
        source: anyhow::Error,
    },
}
