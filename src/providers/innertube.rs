use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{
    json3_track_url, resolve_request_id, segments_from_json3, select_caption_track, CaptionTrack,
    ProviderId, Transcript, TranscriptProvider, TranscriptRequest,
};
use crate::{Result, TranscriptError};

const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";

/// Client identity presented to the player endpoint; the Android client gets
/// caption tracks without the web player's signature dance.
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "19.09.37";

/// Known-good video used for the availability probe
const PROBE_VIDEO_ID: &str = "jNQXAC9IVRw";

/// Transcript provider backed by the InnerTube player endpoint
///
/// The internal API the clients themselves use. Unauthenticated and fast,
/// but an unstable contract that can change or start requiring login at any
/// time, so failures here are expected and recovered by the fallback walk.
pub struct InnerTubeProvider {
    client: reqwest::Client,
    priority: u8,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    #[serde(rename = "videoDetails")]
    video_details: Option<VideoDetails>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    renderer: Option<CaptionsRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionsRenderer {
    #[serde(rename = "captionTracks", default)]
    caption_tracks: Vec<CaptionTrack>,
}

impl InnerTubeProvider {
    pub fn new(client: reqwest::Client, priority: u8) -> Self {
        Self { client, priority }
    }

    fn id(&self) -> ProviderId {
        ProviderId::from(ProviderId::INNERTUBE)
    }

    async fn player_response(
        &self,
        video_id: &str,
        language: Option<&str>,
        country: Option<&str>,
    ) -> Result<PlayerResponse> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "hl": language.unwrap_or("en"),
                    "gl": country.unwrap_or("US"),
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(PLAYER_URL)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.wrap(e.into()))?;

        if !response.status().is_success() {
            return Err(super::error_for_status(self.id(), response.status(), video_id));
        }

        response.json().await.map_err(|e| self.wrap(e.into()))
    }

    fn wrap(&self, source: anyhow::Error) -> TranscriptError {
        TranscriptError::Provider {
            provider: self.id(),
            source,
        }
    }
}

#[async_trait]
impl TranscriptProvider for InnerTubeProvider {
    async fn fetch_transcript(&self, request: &TranscriptRequest) -> Result<Transcript> {
        let video_id = resolve_request_id(self, request)?;
        tracing::debug!("Fetching transcript via InnerTube for video: {}", video_id);

        let player = self
            .player_response(
                &video_id,
                request.language.as_deref(),
                request.country.as_deref(),
            )
            .await?;

        if let Some(status) = &player.playability_status {
            match status.status.as_str() {
                "OK" => {}
                "LOGIN_REQUIRED" => {
                    return Err(TranscriptError::AuthenticationFailed(self.id()));
                }
                "ERROR" => return Err(TranscriptError::TranscriptNotFound(video_id)),
                other => {
                    return Err(self.wrap(anyhow::anyhow!(
                        "video not playable: {} ({})",
                        other,
                        status.reason.as_deref().unwrap_or("no reason given")
                    )));
                }
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.renderer)
            .map(|r| r.caption_tracks)
            .unwrap_or_default();
        if tracks.is_empty() {
            return Err(TranscriptError::TranscriptDisabled(video_id));
        }

        let track = select_caption_track(&tracks, request.language.as_deref())
            .ok_or_else(|| TranscriptError::TranscriptDisabled(video_id.clone()))?;

        let track_url = json3_track_url(&track.base_url).map_err(|e| self.wrap(e))?;
        let response = self
            .client
            .get(track_url)
            .send()
            .await
            .map_err(|e| self.wrap(e.into()))?;
        if !response.status().is_success() {
            return Err(super::error_for_status(self.id(), response.status(), &video_id));
        }
        let body = response.text().await.map_err(|e| self.wrap(e.into()))?;

        let segments = segments_from_json3(&body).map_err(|e| self.wrap(e))?;
        if segments.is_empty() {
            return Err(TranscriptError::TranscriptNotFound(video_id));
        }

        Ok(Transcript {
            video_id,
            title: player.video_details.and_then(|d| d.title),
            language: track.language_code.clone(),
            segments,
            provider: self.id(),
            created_at: Utc::now(),
        })
    }

    async fn is_available(&self) -> bool {
        let body = json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                }
            },
            "videoId": PROBE_VIDEO_ID,
        });

        self.client
            .post(PLAYER_URL)
            .json(&body)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_response_parsing() {
        let body = r#"{
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {"title": "Some Video"},
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://example.com/tt?v=abc", "languageCode": "en"}
                    ]
                }
            }
        }"#;

        let parsed: PlayerResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.playability_status.unwrap().status, "OK");
        assert_eq!(parsed.video_details.unwrap().title.as_deref(), Some("Some Video"));
        let tracks = parsed.captions.unwrap().renderer.unwrap().caption_tracks;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");
    }

    #[test]
    fn test_player_response_without_captions() {
        let body = r#"{"playabilityStatus": {"status": "OK", "reason": null}}"#;
        let parsed: PlayerResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.captions.is_none());
        assert!(parsed.video_details.is_none());
    }
}
