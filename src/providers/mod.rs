use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub mod innertube;
pub mod timedtext;
pub mod transcript_service;
pub mod youtube_api;

use crate::{Result, TranscriptError};

/// Stable identifier naming a transcript provider
///
/// Used both as the registry key and as a value in a request's
/// `preferredProviders` list. The built-in providers use the constants below;
/// new providers registered at runtime may use any non-empty name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub const YOUTUBE_API: &'static str = "youtube-api";
    pub const TIMEDTEXT: &'static str = "timedtext";
    pub const INNERTUBE: &'static str = "innertube";
    pub const TRANSCRIPT_SERVICE: &'static str = "transcript-service";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A transcript extraction request
///
/// Identifies a video by ID or raw URL. Immutable once constructed; the
/// orchestrator validates that at least one of the two is present before any
/// provider is contacted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptRequest {
    /// Opaque provider-specific video identifier
    #[serde(rename = "videoID", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,

    /// Raw video URL, resolved to an ID by the provider's own logic
    #[serde(rename = "videoURL", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Preferred transcript language (BCP-47 tag)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Country hint for region-restricted lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Ordered per-request override of the provider try-order
    #[serde(rename = "preferredProviders", default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_providers: Vec<ProviderId>,
}

impl TranscriptRequest {
    /// Create a request for a bare video ID
    pub fn for_video_id(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Self::default()
        }
    }

    /// Create a request for a raw video URL
    pub fn for_url(video_url: impl Into<String>) -> Self {
        Self {
            video_url: Some(video_url.into()),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_preferred_providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.preferred_providers = providers;
        self
    }

    /// Whether the request identifies a video at all
    pub fn has_subject(&self) -> bool {
        self.video_id.as_deref().is_some_and(|id| !id.is_empty())
            || self.video_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text (never empty)
    pub text: String,

    /// Offset from the start of the video in seconds
    pub start: f64,

    /// Segment length in seconds
    pub duration: f64,

    /// Raw upstream offset in milliseconds, when the source exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// A complete extracted transcript
///
/// Created only as the successful result of one provider trial and never
/// mutated afterwards. Segment order is significant and preserved end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(rename = "videoID")]
    pub video_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub language: String,

    pub segments: Vec<TranscriptSegment>,

    /// Which provider produced this transcript
    pub provider: ProviderId,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    /// Concatenate all segment text into a single string
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total duration covered by the segments, in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .last()
            .map(|s| s.start + s.duration)
            .unwrap_or(0.0)
    }
}

/// Capability contract every transcript provider implements
///
/// Implementations must be safe for concurrent use: the orchestrator shares a
/// single instance across simultaneous requests and never serializes calls
/// into it. Network I/O belongs inside the adapter; no shared state visible to
/// the orchestrator may be mutated.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch a transcript for the requested video
    async fn fetch_transcript(&self, request: &TranscriptRequest) -> Result<Transcript>;

    /// Cheap liveness probe; excludes the provider from the current trial
    /// cycle when false, without removing it from the registry
    async fn is_available(&self) -> bool;

    /// Stable identifier, never changes after construction
    fn provider_id(&self) -> ProviderId;

    /// Static tie-break priority; lower values are tried earlier when no
    /// per-request preference applies
    fn priority(&self) -> u8;

    /// Extract a canonical video ID from a raw URL
    fn resolve_video_id(&self, url: &str) -> Result<String> {
        parse_video_id(url).ok_or_else(|| TranscriptError::UnresolvableUrl(url.to_string()))
    }
}

/// Resolve the video ID a request refers to, using the provider's own URL logic
pub fn resolve_request_id<P>(provider: &P, request: &TranscriptRequest) -> Result<String>
where
    P: TranscriptProvider + ?Sized,
{
    if let Some(id) = request.video_id.as_deref() {
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    match request.video_url.as_deref() {
        Some(url) if !url.is_empty() => provider.resolve_video_id(url),
        _ => Err(TranscriptError::InvalidVideoId),
    }
}

/// Extract a video ID from a URL or bare ID string
///
/// Recognizes the usual watch/embed/shorts/live paths plus youtu.be short
/// links; an 11-character ID passes through unchanged.
pub fn parse_video_id(input: &str) -> Option<String> {
    if is_bare_video_id(input) {
        return Some(input.to_string());
    }

    let parsed = Url::parse(input).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(|s| s.to_string()),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next()? {
                "watch" => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                "embed" | "v" | "shorts" | "live" => segments.next().map(|s| s.to_string()),
                _ => None,
            }
        }
        _ => None,
    };

    candidate.filter(|id| is_bare_video_id(id))
}

fn is_bare_video_id(input: &str) -> bool {
    input.len() == 11
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// json3 is the caption payload format shared by the timedtext endpoint and
// the InnerTube player response.
#[derive(Debug, Deserialize)]
struct Json3Body {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    start_ms: Option<i64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<i64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Parse a json3 caption payload into ordered transcript segments
///
/// Events without text (window definitions, music cues rendered as newlines)
/// are dropped; segment order follows event order.
pub fn segments_from_json3(body: &str) -> anyhow::Result<Vec<TranscriptSegment>> {
    let parsed: Json3Body = serde_json::from_str(body)?;

    let mut segments = Vec::with_capacity(parsed.events.len());
    for event in parsed.events {
        let Some(segs) = event.segs else { continue };

        let text = segs
            .into_iter()
            .filter_map(|s| s.utf8)
            .collect::<String>()
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }

        let start_ms = event.start_ms.unwrap_or(0);
        segments.push(TranscriptSegment {
            text,
            start: start_ms as f64 / 1000.0,
            duration: event.duration_ms.unwrap_or(0) as f64 / 1000.0,
            offset: Some(start_ms),
        });
    }

    Ok(segments)
}

/// One caption track as advertised by the watch page or the player endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// "asr" marks an auto-generated track
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Pick the best caption track for a requested language
///
/// Manually-authored tracks beat auto-generated ones; an exact language match
/// beats a primary-subtag match; with no requested language the first
/// manually-authored track wins, then anything.
pub(crate) fn select_caption_track<'a>(
    tracks: &'a [CaptionTrack],
    language: Option<&str>,
) -> Option<&'a CaptionTrack> {
    if let Some(lang) = language {
        let primary = lang.split('-').next().unwrap_or(lang);
        let exact = |t: &&CaptionTrack| t.language_code.eq_ignore_ascii_case(lang);
        let prefix = |t: &&CaptionTrack| {
            t.language_code
                .split('-')
                .next()
                .is_some_and(|p| p.eq_ignore_ascii_case(primary))
        };

        return tracks
            .iter()
            .filter(|t| !t.is_generated())
            .find(exact)
            .or_else(|| tracks.iter().find(exact))
            .or_else(|| tracks.iter().filter(|t| !t.is_generated()).find(prefix))
            .or_else(|| tracks.iter().find(prefix));
    }

    tracks
        .iter()
        .find(|t| !t.is_generated())
        .or_else(|| tracks.first())
}

/// Rewrite a caption track URL to request the json3 payload format
pub(crate) fn json3_track_url(base_url: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base_url)?;
    // Drop any existing fmt parameter before forcing json3.
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("fmt", "json3");
    Ok(url)
}

/// Map an HTTP status from an upstream caption endpoint onto the error taxonomy
pub(crate) fn error_for_status(
    provider: ProviderId,
    status: reqwest::StatusCode,
    video_id: &str,
) -> TranscriptError {
    match status.as_u16() {
        401 | 403 => TranscriptError::AuthenticationFailed(provider),
        404 => TranscriptError::TranscriptNotFound(video_id.to_string()),
        429 => TranscriptError::RateLimitExceeded(provider),
        code => TranscriptError::Provider {
            provider,
            source: anyhow::anyhow!("unexpected HTTP status {}", code),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id_watch_url() {
        assert_eq!(
            parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_parse_video_id_short_and_embed_urls() {
        assert_eq!(
            parse_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_parse_video_id_bare_id_passthrough() {
        assert_eq!(
            parse_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_parse_video_id_rejects_unknown_input() {
        assert_eq!(parse_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(parse_video_id("not a url"), None);
        assert_eq!(parse_video_id("tooshort"), None);
    }

    #[test]
    fn test_request_has_subject() {
        assert!(TranscriptRequest::for_video_id("dQw4w9WgXcQ").has_subject());
        assert!(TranscriptRequest::for_url("https://youtu.be/dQw4w9WgXcQ").has_subject());
        assert!(!TranscriptRequest::default().has_subject());

        let empty_strings = TranscriptRequest {
            video_id: Some(String::new()),
            video_url: Some(String::new()),
            ..TranscriptRequest::default()
        };
        assert!(!empty_strings.has_subject());
    }

    #[test]
    fn test_request_wire_shape() {
        let json = r#"{
            "videoURL": "https://youtu.be/dQw4w9WgXcQ",
            "language": "en",
            "preferredProviders": ["innertube", "timedtext"]
        }"#;
        let request: TranscriptRequest = serde_json::from_str(json).unwrap();

        assert_eq!(
            request.video_url.as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
        assert_eq!(request.language.as_deref(), Some("en"));
        assert_eq!(
            request.preferred_providers,
            vec![ProviderId::from("innertube"), ProviderId::from("timedtext")]
        );
    }

    #[test]
    fn test_transcript_wire_shape() {
        let transcript = Transcript {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: None,
            language: "en".to_string(),
            segments: vec![TranscriptSegment {
                text: "hello".to_string(),
                start: 0.5,
                duration: 1.2,
                offset: Some(500),
            }],
            provider: ProviderId::from(ProviderId::INNERTUBE),
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(value["videoID"], "dQw4w9WgXcQ");
        assert_eq!(value["provider"], "innertube");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("title").is_none());
        assert_eq!(value["segments"][0]["text"], "hello");
        assert_eq!(value["segments"][0]["start"], 0.5);
    }

    #[test]
    fn test_segments_from_json3() {
        let body = r#"{
            "events": [
                {"tStartMs": 0, "dDurationMs": 2000, "segs": [{"utf8": "hello "}, {"utf8": "world"}]},
                {"tStartMs": 2000, "dDurationMs": 1000},
                {"tStartMs": 3000, "dDurationMs": 500, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 3500, "dDurationMs": 1500, "segs": [{"utf8": "again"}]}
            ]
        }"#;

        let segments = segments_from_json3(body).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.0);
        assert_eq!(segments[0].offset, Some(0));
        assert_eq!(segments[1].text, "again");
        assert_eq!(segments[1].start, 3.5);
    }

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.com/timedtext?lang={}", lang),
            language_code: lang.to_string(),
            kind: kind.map(|k| k.to_string()),
        }
    }

    #[test]
    fn test_select_caption_track_prefers_manual_exact_match() {
        let tracks = vec![track("en", Some("asr")), track("en", None), track("de", None)];

        let chosen = select_caption_track(&tracks, Some("en")).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(chosen.kind.is_none());
    }

    #[test]
    fn test_select_caption_track_falls_back_to_primary_subtag() {
        let tracks = vec![track("de", None), track("en-GB", None)];

        let chosen = select_caption_track(&tracks, Some("en-US")).unwrap();
        assert_eq!(chosen.language_code, "en-GB");
    }

    #[test]
    fn test_select_caption_track_without_language_prefers_manual() {
        let tracks = vec![track("ja", Some("asr")), track("ja", None)];
        let chosen = select_caption_track(&tracks, None).unwrap();
        assert!(chosen.kind.is_none());

        let generated_only = vec![track("ja", Some("asr"))];
        assert!(select_caption_track(&generated_only, None).is_some());
        assert!(select_caption_track(&[], None).is_none());
    }

    #[test]
    fn test_json3_track_url_replaces_fmt() {
        let url = json3_track_url("https://example.com/api/timedtext?v=abc&fmt=srv3").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("v".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("fmt".to_string(), "json3".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "fmt").count(), 1);
    }

    #[test]
    fn test_transcript_full_text_and_duration() {
        let transcript = Transcript {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: Some("Test".to_string()),
            language: "en".to_string(),
            segments: vec![
                TranscriptSegment {
                    text: "one".to_string(),
                    start: 0.0,
                    duration: 1.0,
                    offset: None,
                },
                TranscriptSegment {
                    text: "two".to_string(),
                    start: 1.0,
                    duration: 2.5,
                    offset: None,
                },
            ],
            provider: ProviderId::from(ProviderId::TIMEDTEXT),
            created_at: Utc::now(),
        };

        assert_eq!(transcript.full_text(), "one two");
        assert_eq!(transcript.duration_seconds(), 3.5);
    }
}
