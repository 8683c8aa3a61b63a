use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcripts::cli::{Cli, Commands};
use yt_transcripts::config::Config;
use yt_transcripts::output;
use yt_transcripts::providers::{ProviderId, TranscriptRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "yt_transcripts=debug"
    } else {
        "yt_transcripts=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Get {
            video,
            output,
            format,
            language,
            country,
            provider,
            prefer,
            timeout,
            timestamps,
        } => {
            let orchestrator = config.build_orchestrator()?;

            let mut request = if video.starts_with("http://") || video.starts_with("https://") {
                TranscriptRequest::for_url(&video)
            } else {
                TranscriptRequest::for_video_id(&video)
            };
            request.language = language.or_else(|| config.app.default_language.clone());
            request.country = country;
            request.preferred_providers =
                prefer.iter().map(|p| ProviderId::from(p.as_str())).collect();

            tracing::info!("Fetching transcript for: {}", video);

            let fetch = async {
                match &provider {
                    Some(name) => {
                        orchestrator
                            .get_transcript_with_provider(
                                &ProviderId::from(name.as_str()),
                                &request,
                            )
                            .await
                    }
                    None => orchestrator.get_transcript(&request).await,
                }
            };

            let transcript = match timeout {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fetch)
                    .await
                    .context("Transcript request timed out")??,
                None => fetch.await?,
            };

            match output {
                Some(path) => {
                    output::save_to_file(&transcript, &path, &format, timestamps).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&transcript, &format, timestamps)?;
                }
            }
        }
        Commands::Providers => {
            let orchestrator = config.build_orchestrator()?;
            let report = orchestrator.health_check().await;

            println!("Registered providers:");
            for (name, available) in &report.providers {
                let status = if *available { "available" } else { "unavailable" };
                println!("  • {} ({})", name, status);
            }
        }
        Commands::Health => {
            let orchestrator = config.build_orchestrator()?;
            let report = orchestrator.health_check().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written to disk");
            }
        }
    }

    Ok(())
}
