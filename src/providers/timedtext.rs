use async_trait::async_trait;
use chrono::Utc;

use super::{
    json3_track_url, resolve_request_id, segments_from_json3, select_caption_track, CaptionTrack,
    ProviderId, Transcript, TranscriptProvider, TranscriptRequest,
};
use crate::{Result, TranscriptError};

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PROBE_URL: &str = "https://www.youtube.com/robots.txt";

/// Transcript provider using the watch-page caption tracks
///
/// The technique community transcript libraries use: fetch the watch page,
/// pull the caption track list out of the embedded player response, then
/// fetch the selected track in json3 format. No authentication, but fragile
/// against markup changes and subject to aggressive rate limiting.
pub struct TimedTextProvider {
    client: reqwest::Client,
    priority: u8,
}

impl TimedTextProvider {
    pub fn new(client: reqwest::Client, priority: u8) -> Self {
        Self { client, priority }
    }

    fn id(&self) -> ProviderId {
        ProviderId::from(ProviderId::TIMEDTEXT)
    }

    async fn fetch_watch_page(&self, video_id: &str, language: Option<&str>) -> Result<String> {
        let mut request = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            // Skips the consent interstitial served in some regions.
            .header("Cookie", "CONSENT=YES+cb");
        if let Some(lang) = language {
            request = request.header("Accept-Language", lang);
        }

        let response = request.send().await.map_err(|e| self.wrap(e.into()))?;
        if !response.status().is_success() {
            return Err(super::error_for_status(self.id(), response.status(), video_id));
        }

        response.text().await.map_err(|e| self.wrap(e.into()))
    }

    fn wrap(&self, source: anyhow::Error) -> TranscriptError {
        TranscriptError::Provider {
            provider: self.id(),
            source,
        }
    }
}

#[async_trait]
impl TranscriptProvider for TimedTextProvider {
    async fn fetch_transcript(&self, request: &TranscriptRequest) -> Result<Transcript> {
        let video_id = resolve_request_id(self, request)?;
        tracing::debug!("Fetching transcript via timedtext for video: {}", video_id);

        let page = self
            .fetch_watch_page(&video_id, request.language.as_deref())
            .await?;

        let tracks = match extract_caption_tracks(&page) {
            Some(tracks) if !tracks.is_empty() => tracks,
            _ => {
                // A playable page without caption tracks means captions are
                // turned off; an error page means the video itself is gone.
                if page.contains("\"status\":\"ERROR\"") {
                    return Err(TranscriptError::TranscriptNotFound(video_id));
                }
                return Err(TranscriptError::TranscriptDisabled(video_id));
            }
        };

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
            title: extract_title(&page),
            language: track.language_code.clone(),
            segments,
            provider: self.id(),
            created_at: Utc::now(),
        })
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(PROBE_URL)
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

/// Pull the caption track array out of the embedded player response JSON
fn extract_caption_tracks(page: &str) -> Option<Vec<CaptionTrack>> {
    let needle = "\"captionTracks\":";
    let start = page.find(needle)? + needle.len();
    let array = balanced_json_array(&page[start..])?;
    serde_json::from_str(array).ok()
}

/// Take the balanced `[...]` prefix of the input, honoring strings and escapes
fn balanced_json_array(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Video title from the page `<title>` element, minus the site suffix
fn extract_title(page: &str) -> Option<String> {
    let start = page.find("<title>")? + "<title>".len();
    let end = page[start..].find("</title>")? + start;
    let title = page[start..end]
        .trim()
        .trim_end_matches(" - YouTube")
        .to_string();
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_caption_tracks() {
        let page = r#"prefix "captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
            {"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","languageCode":"en","kind":"asr"},
            {"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=de","languageCode":"de"}
        ]}} suffix"#;

        let tracks = extract_caption_tracks(page).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "en");
        assert_eq!(tracks[0].kind.as_deref(), Some("asr"));
        assert_eq!(tracks[1].language_code, "de");
    }

    #[test]
    fn test_extract_caption_tracks_absent() {
        assert!(extract_caption_tracks("<html>no captions here</html>").is_none());
    }

    #[test]
    fn test_balanced_json_array_handles_nested_and_strings() {
        let input = r#"[{"a":[1,2],"b":"br]acket"},{"c":3}] trailing"#;
        let array = balanced_json_array(input).unwrap();
        assert_eq!(array, r#"[{"a":[1,2],"b":"br]acket"},{"c":3}]"#);

        assert!(balanced_json_array("not an array").is_none());
        assert!(balanced_json_array("[unclosed").is_none());
    }

    #[test]
    fn test_extract_title() {
        let page = "<html><head><title>Some Video - YouTube</title></head></html>";
        assert_eq!(extract_title(page), Some("Some Video".to_string()));

        assert_eq!(extract_title("<title></title>"), None);
        assert_eq!(extract_title("no title tag"), None);
    }
}
