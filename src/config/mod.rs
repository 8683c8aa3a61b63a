use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::orchestrator::TranscriptOrchestrator;
use crate::providers::innertube::InnerTubeProvider;
use crate::providers::timedtext::TimedTextProvider;
use crate::providers::transcript_service::TranscriptServiceProvider;
use crate::providers::youtube_api::YoutubeApiProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-provider settings
    pub providers: ProvidersConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Official YouTube Data API v3 (requires an API key)
    pub youtube_api: YoutubeApiConfig,

    /// Watch-page caption track scraping
    pub timedtext: TimedTextConfig,

    /// InnerTube player endpoint
    pub innertube: InnerTubeConfig,

    /// Dedicated transcript-only HTTP service
    pub transcript_service: TranscriptServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeApiConfig {
    pub enabled: bool,

    /// Lower priority values are tried earlier
    pub priority: u8,

    /// API key; falls back to the YOUTUBE_API_KEY environment variable
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedTextConfig {
    pub enabled: bool,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerTubeConfig {
    pub enabled: bool,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptServiceConfig {
    pub enabled: bool,
    pub priority: u8,

    /// Base URL of the service, e.g. "https://transcripts.example.com/"
    pub base_url: String,

    /// Optional bearer token
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Timeout for a single upstream HTTP request, in seconds
    pub request_timeout_secs: u64,

    /// Bound on a single provider availability probe, in seconds
    pub probe_timeout_secs: u64,

    /// User agent presented to upstream services
    pub user_agent: String,

    /// Default transcript language when a request specifies none
    pub default_language: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig {
                youtube_api: YoutubeApiConfig {
                    enabled: false,
                    priority: 3,
                    api_key: String::new(),
                },
                timedtext: TimedTextConfig {
                    enabled: true,
                    priority: 2,
                },
                innertube: InnerTubeConfig {
                    enabled: true,
                    priority: 1,
                },
                transcript_service: TranscriptServiceConfig {
                    enabled: false,
                    priority: 4,
                    base_url: String::new(),
                    api_token: None,
                },
            },
            app: AppConfig {
                request_timeout_secs: 30,
                probe_timeout_secs: 5,
                user_agent: concat!("yt-transcripts/", env!("CARGO_PKG_VERSION")).to_string(),
                default_language: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcripts").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let providers = &self.providers;
        if !providers.youtube_api.enabled
            && !providers.timedtext.enabled
            && !providers.innertube.enabled
            && !providers.transcript_service.enabled
        {
            anyhow::bail!("At least one transcript provider must be enabled");
        }

        if providers.youtube_api.enabled && self.youtube_api_key().is_empty() {
            anyhow::bail!(
                "youtube_api is enabled but no API key is configured (set api_key or YOUTUBE_API_KEY)"
            );
        }

        if providers.transcript_service.enabled {
            Url::parse(&providers.transcript_service.base_url)
                .context("transcript_service.base_url is not a valid URL")?;
        }

        Ok(())
    }

    /// Effective Data API key, with environment fallback
    pub fn youtube_api_key(&self) -> String {
        if !self.providers.youtube_api.api_key.is_empty() {
            return self.providers.youtube_api.api_key.clone();
        }
        std::env::var("YOUTUBE_API_KEY").unwrap_or_default()
    }

    /// Construct the orchestrator and register every enabled provider
    pub fn build_orchestrator(&self) -> Result<TranscriptOrchestrator> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.app.request_timeout_secs))
            .user_agent(self.app.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        let orchestrator = TranscriptOrchestrator::new()
            .with_probe_timeout(Duration::from_secs(self.app.probe_timeout_secs));

        let providers = &self.providers;
        if providers.innertube.enabled {
            orchestrator.register_provider(Arc::new(InnerTubeProvider::new(
                client.clone(),
                providers.innertube.priority,
            )))?;
        }
        if providers.timedtext.enabled {
            orchestrator.register_provider(Arc::new(TimedTextProvider::new(
                client.clone(),
                providers.timedtext.priority,
            )))?;
        }
        if providers.youtube_api.enabled {
            orchestrator.register_provider(Arc::new(YoutubeApiProvider::new(
                client.clone(),
                self.youtube_api_key(),
                providers.youtube_api.priority,
            )))?;
        }
        if providers.transcript_service.enabled {
            let base_url = Url::parse(&providers.transcript_service.base_url)
                .context("transcript_service.base_url is not a valid URL")?;
            orchestrator.register_provider(Arc::new(TranscriptServiceProvider::new(
                client,
                base_url,
                providers.transcript_service.api_token.clone(),
                providers.transcript_service.priority,
            )))?;
        }

        if orchestrator.registered_count() == 0 {
            anyhow::bail!("No transcript providers are enabled");
        }

        Ok(orchestrator)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Request timeout: {}s", self.app.request_timeout_secs);
        println!("  Probe timeout: {}s", self.app.probe_timeout_secs);
        if let Some(lang) = &self.app.default_language {
            println!("  Default language: {}", lang);
        }
        println!("  Providers:");
        println!(
            "    innertube: enabled={} priority={}",
            self.providers.innertube.enabled, self.providers.innertube.priority
        );
        println!(
            "    timedtext: enabled={} priority={}",
            self.providers.timedtext.enabled, self.providers.timedtext.priority
        );
        println!(
            "    youtube-api: enabled={} priority={}",
            self.providers.youtube_api.enabled, self.providers.youtube_api.priority
        );
        println!(
            "    transcript-service: enabled={} priority={} base_url={}",
            self.providers.transcript_service.enabled,
            self.providers.transcript_service.priority,
            self.providers.transcript_service.base_url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_no_enabled_providers() {
        let mut config = Config::default();
        config.providers.innertube.enabled = false;
        config.providers.timedtext.enabled = false;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_service_url() {
        let mut config = Config::default();
        config.providers.transcript_service.enabled = true;
        config.providers.transcript_service.base_url = "not a url".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
providers:
  youtube_api:
    enabled: false
    priority: 3
    api_key: ""
  timedtext:
    enabled: true
    priority: 2
  innertube:
    enabled: true
    priority: 1
  transcript_service:
    enabled: true
    priority: 4
    base_url: "https://transcripts.example.com/"
    api_token: "secret"
app:
  request_timeout_secs: 10
  probe_timeout_secs: 2
  user_agent: "test-agent"
  default_language: "en"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.app.request_timeout_secs, 10);
        assert_eq!(config.providers.transcript_service.priority, 4);
        assert_eq!(
            config.providers.transcript_service.api_token.as_deref(),
            Some("secret")
        );
    }

    #[test]
    fn test_build_orchestrator_registers_enabled_providers() {
        let config = Config::default();
        let orchestrator = config.build_orchestrator().unwrap();

        // innertube + timedtext enabled by default
        assert_eq!(orchestrator.registered_count(), 2);
    }
}
