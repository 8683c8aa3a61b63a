use anyhow::Result;
use std::fmt::Write;

use crate::providers::Transcript;

/// Render as plain text, one segment per line
pub fn format_as_text(transcript: &Transcript, include_timestamps: bool) -> String {
    let mut out = String::new();

    if let Some(title) = &transcript.title {
        let _ = writeln!(out, "# {}", title);
        out.push('\n');
    }

    for segment in &transcript.segments {
        if include_timestamps {
            let _ = writeln!(out, "[{}] {}", clock_timestamp(segment.start), segment.text);
        } else {
            let _ = writeln!(out, "{}", segment.text);
        }
    }

    out.trim_end().to_string()
}

/// Render as pretty-printed JSON in the wire shape
pub fn format_as_json(transcript: &Transcript) -> Result<String> {
    Ok(serde_json::to_string_pretty(transcript)?)
}

/// Render as an SRT subtitle document
pub fn format_as_srt(transcript: &Transcript) -> String {
    let mut out = String::new();

    for (index, segment) in transcript.segments.iter().enumerate() {
        let start = segment.start;
        let end = segment.start + segment.duration;
        let _ = writeln!(out, "{}", index + 1);
        let _ = writeln!(out, "{} --> {}", srt_timestamp(start), srt_timestamp(end));
        let _ = writeln!(out, "{}", segment.text);
        out.push('\n');
    }

    out.trim_end().to_string()
}

/// "HH:MM:SS,mmm" as used by SRT timing lines
fn srt_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let secs = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// "MM:SS" (or "H:MM:SS") for readable text output
fn clock_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let secs = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::providers::{ProviderId, TranscriptSegment};

    fn sample() -> Transcript {
        Transcript {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: Some("Sample".to_string()),
            language: "en".to_string(),
            segments: vec![
                TranscriptSegment {
                    text: "first".to_string(),
                    start: 0.0,
                    duration: 1.5,
                    offset: None,
                },
                TranscriptSegment {
                    text: "second".to_string(),
                    start: 61.25,
                    duration: 2.0,
                    offset: None,
                },
            ],
            provider: ProviderId::from(ProviderId::INNERTUBE),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_as_text() {
        let plain = format_as_text(&sample(), false);
        assert_eq!(plain, "# Sample\n\nfirst\nsecond");

        let timed = format_as_text(&sample(), true);
        assert!(timed.contains("[00:00] first"));
        assert!(timed.contains("[01:01] second"));
    }

    #[test]
    fn test_format_as_srt() {
        let srt = format_as_srt(&sample());
        let expected = "1\n00:00:00,000 --> 00:00:01,500\nfirst\n\n\
                        2\n00:01:01,250 --> 00:01:03,250\nsecond";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_srt_timestamp() {
        assert_eq!(srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(srt_timestamp(3723.25), "01:02:03,250");
    }

    #[test]
    fn test_format_as_json_uses_wire_names() {
        let json = format_as_json(&sample()).unwrap();
        assert!(json.contains("\"videoID\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"provider\""));
    }
}
