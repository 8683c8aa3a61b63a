use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{
    error_for_status, resolve_request_id, ProviderId, Transcript, TranscriptProvider,
    TranscriptRequest, TranscriptSegment,
};
use crate::{Result, TranscriptError};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Known-good video used for the availability probe ("Me at the zoo")
const PROBE_VIDEO_ID: &str = "jNQXAC9IVRw";

/// Transcript provider backed by the official YouTube Data API v3
///
/// Requires an API key; caption listing and download quota apply, so this
/// provider is usually configured with a low priority despite being the most
/// reliable source.
pub struct YoutubeApiProvider {
    client: reqwest::Client,
    api_key: String,
    priority: u8,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<CaptionItem>,
}

#[derive(Debug, Deserialize)]
struct CaptionItem {
    id: String,
    snippet: CaptionSnippet,
}

#[derive(Debug, Deserialize)]
struct CaptionSnippet {
    language: String,
    #[serde(rename = "trackKind", default)]
    track_kind: Option<String>,
}

impl YoutubeApiProvider {
    pub fn new(client: reqwest::Client, api_key: String, priority: u8) -> Self {
        Self {
            client,
            api_key,
            priority,
        }
    }

    fn id(&self) -> ProviderId {
        ProviderId::from(ProviderId::YOUTUBE_API)
    }

    async fn video_title(&self, video_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/videos", API_BASE))
            .query(&[("part", "snippet"), ("id", video_id), ("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| self.wrap(e.into()))?;

        if !response.status().is_success() {
            return Err(error_for_status(self.id(), response.status(), video_id));
        }

        let listing: VideoListResponse =
            response.json().await.map_err(|e| self.wrap(e.into()))?;
        let item = listing
            .items
            .into_iter()
            .next()
            .ok_or_else(|| TranscriptError::TranscriptNotFound(video_id.to_string()))?;

        Ok(item.snippet.title)
    }

    async fn list_caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionItem>> {
        let response = self
            .client
            .get(format!("{}/captions", API_BASE))
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| self.wrap(e.into()))?;

        if !response.status().is_success() {
            return Err(error_for_status(self.id(), response.status(), video_id));
        }

        let listing: CaptionListResponse =
            response.json().await.map_err(|e| self.wrap(e.into()))?;
        Ok(listing.items)
    }

    async fn download_track(&self, track_id: &str, video_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/captions/{}", API_BASE, track_id))
            .query(&[("tfmt", "srt"), ("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| self.wrap(e.into()))?;

        if !response.status().is_success() {
            return Err(error_for_status(self.id(), response.status(), video_id));
        }

        response.text().await.map_err(|e| self.wrap(e.into()))
    }

    fn pick_track<'a>(
        tracks: &'a [CaptionItem],
        language: Option<&str>,
    ) -> Option<&'a CaptionItem> {
        let manual = |t: &&CaptionItem| {
            !t.snippet
                .track_kind
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case("asr"))
        };

        if let Some(lang) = language {
            let matches = |t: &&CaptionItem| t.snippet.language.eq_ignore_ascii_case(lang);
            return tracks
                .iter()
                .filter(manual)
                .find(matches)
                .or_else(|| tracks.iter().find(matches));
        }

        tracks.iter().find(manual).or_else(|| tracks.first())
    }

    fn wrap(&self, source: anyhow::Error) -> TranscriptError {
        TranscriptError::Provider {
            provider: self.id(),
            source,
        }
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeApiProvider {
    async fn fetch_transcript(&self, request: &TranscriptRequest) -> Result<Transcript> {
        let video_id = resolve_request_id(self, request)?;
        tracing::debug!("Fetching transcript via Data API for video: {}", video_id);

        let title = self.video_title(&video_id).await?;

        let tracks = self.list_caption_tracks(&video_id).await?;
        if tracks.is_empty() {
            return Err(TranscriptError::TranscriptNotFound(video_id));
        }

        let track = Self::pick_track(&tracks, request.language.as_deref())
            .ok_or_else(|| TranscriptError::TranscriptNotFound(video_id.clone()))?;

        let body = self.download_track(&track.id, &video_id).await?;
        let segments = parse_srt(&body);
        if segments.is_empty() {
            return Err(TranscriptError::TranscriptNotFound(video_id));
        }

        Ok(Transcript {
            video_id,
            title: Some(title),
            language: track.snippet.language.clone(),
            segments,
            provider: self.id(),
            created_at: Utc::now(),
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            return false;
        }

        self.client
            .get(format!("{}/videos", API_BASE))
            .query(&[("part", "id"), ("id", PROBE_VIDEO_ID), ("key", &self.api_key)])
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

/// Parse an SRT document into ordered transcript segments
fn parse_srt(body: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();

    for block in body.replace("\r\n", "\n").split("\n\n") {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty());

        // Index line, then the timing line.
        let Some(first) = lines.next() else { continue };
        let timing = if first.contains("-->") {
            first
        } else {
            match lines.next() {
                Some(line) if line.contains("-->") => line,
                _ => continue,
            }
        };

        let Some((start_raw, end_raw)) = timing.split_once("-->") else {
            continue;
        };
        let (Some(start), Some(end)) = (
            parse_srt_timestamp(start_raw.trim()),
            parse_srt_timestamp(end_raw.trim()),
        ) else {
            continue;
        };

        let text = lines.collect::<Vec<_>>().join(" ").trim().to_string();
        if text.is_empty() {
            continue;
        }

        segments.push(TranscriptSegment {
            text,
            start,
            duration: (end - start).max(0.0),
            offset: Some((start * 1000.0) as i64),
        });
    }

    segments
}

/// Parse an "HH:MM:SS,mmm" timestamp into seconds
fn parse_srt_timestamp(raw: &str) -> Option<f64> {
    let (clock, millis) = raw.split_once(',')?;
    let mut parts = clock.split(':');

    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    let millis: f64 = millis.trim().parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_srt_timestamp() {
        assert_eq!(parse_srt_timestamp("00:00:01,500"), Some(1.5));
        assert_eq!(parse_srt_timestamp("01:02:03,250"), Some(3723.25));
        assert_eq!(parse_srt_timestamp("bogus"), None);
    }

    #[test]
    fn test_parse_srt_blocks() {
        let body = "1\n00:00:00,000 --> 00:00:02,000\nhello world\n\n\
                    2\n00:00:02,000 --> 00:00:03,500\nsecond line\nwraps here\n";

        let segments = parse_srt(body);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.0);
        assert_eq!(segments[1].text, "second line wraps here");
        assert_eq!(segments[1].duration, 1.5);
    }

    #[test]
    fn test_parse_srt_skips_malformed_blocks() {
        let body = "1\nno timing line here\n\n2\n00:00:01,000 --> 00:00:02,000\nok\n";
        let segments = parse_srt(body);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "ok");
    }

    #[test]
    fn test_pick_track_prefers_manual_language_match() {
        let tracks = vec![
            CaptionItem {
                id: "t1".to_string(),
                snippet: CaptionSnippet {
                    language: "en".to_string(),
                    track_kind: Some("asr".to_string()),
                },
            },
            CaptionItem {
                id: "t2".to_string(),
                snippet: CaptionSnippet {
                    language: "en".to_string(),
                    track_kind: Some("standard".to_string()),
                },
            },
        ];

        let chosen = YoutubeApiProvider::pick_track(&tracks, Some("en")).unwrap();
        assert_eq!(chosen.id, "t2");

        let fallback = YoutubeApiProvider::pick_track(&tracks, None).unwrap();
        assert_eq!(fallback.id, "t2");
    }
}
