use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use url::Url;

use super::{
    error_for_status, resolve_request_id, ProviderId, Transcript, TranscriptProvider,
    TranscriptRequest, TranscriptSegment,
};
use crate::{Result, TranscriptError};

/// Transcript provider backed by a dedicated transcript-only HTTP service
///
/// Points at any service exposing `GET /api/transcript?video_id=...` plus a
/// `GET /health` probe, optionally authenticated with a bearer token. Useful
/// as a self-hosted escape hatch when the direct providers are blocked.
pub struct TranscriptServiceProvider {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
    priority: u8,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    #[serde(alias = "videoId")]
    video_id: Option<String>,
    title: Option<String>,
    language: Option<String>,
    #[serde(default)]
    segments: Vec<ServiceSegment>,
}

#[derive(Debug, Deserialize)]
struct ServiceSegment {
    text: String,
    start: f64,
    duration: f64,
    offset: Option<i64>,
}

impl TranscriptServiceProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        api_token: Option<String>,
        priority: u8,
    ) -> Self {
        Self {
            client,
            base_url,
            api_token,
            priority,
        }
    }

    fn id(&self) -> ProviderId {
        ProviderId::from(ProviderId::TRANSCRIPT_SERVICE)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| self.wrap(e.into()))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn wrap(&self, source: anyhow::Error) -> TranscriptError {
        TranscriptError::Provider {
            provider: self.id(),
            source,
        }
    }
}

#[async_trait]
impl TranscriptProvider for TranscriptServiceProvider {
    async fn fetch_transcript(&self, request: &TranscriptRequest) -> Result<Transcript> {
        let video_id = resolve_request_id(self, request)?;
        tracing::debug!(
            "Fetching transcript via {} for video: {}",
            self.base_url,
            video_id
        );

        let mut endpoint = self.endpoint("api/transcript")?;
        endpoint.query_pairs_mut().append_pair("video_id", &video_id);
        if let Some(lang) = request.language.as_deref() {
            endpoint.query_pairs_mut().append_pair("lang", lang);
        }
        if let Some(country) = request.country.as_deref() {
            endpoint.query_pairs_mut().append_pair("country", country);
        }

        let response = self
            .authorized(self.client.get(endpoint))
            .send()
            .await
            .map_err(|e| self.wrap(e.into()))?;

        if !response.status().is_success() {
            return Err(error_for_status(self.id(), response.status(), &video_id));
        }

        let payload: ServiceResponse = response.json().await.map_err(|e| self.wrap(e.into()))?;
        if payload.segments.is_empty() {
            return Err(TranscriptError::TranscriptNotFound(video_id));
        }

        let segments = payload
            .segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| TranscriptSegment {
                text: s.text,
                start: s.start,
                duration: s.duration,
                offset: s.offset,
            })
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return Err(TranscriptError::TranscriptNotFound(video_id));
        }

        Ok(Transcript {
            video_id: payload.video_id.unwrap_or(video_id),
            title: payload.title,
            language: payload
                .language
                .or_else(|| request.language.clone())
                .unwrap_or_else(|| "en".to_string()),
            segments,
            provider: self.id(),
            created_at: Utc::now(),
        })
    }

    async fn is_available(&self) -> bool {
        let Ok(endpoint) = self.endpoint("health") else {
            return false;
        };

        self.authorized(self.client.get(endpoint))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn provider_id(&self) -> ProviderId {
        self.id()
    }

    fn priority(&self) -> u8 {
        self.priority
    }
}
