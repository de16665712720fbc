use crate::core::format;
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::LazyLock;
use yt_transcript_rs::api::YouTubeTranscriptApi;

const VIDEO_ID_LEN: usize = 11;
const MAX_VIDEO_ID_LEN: usize = 128;

static URL_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/]|$)",
    )
    .expect("Invalid regex")
});

static BARE_VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex"));

/// One timestamped chunk of caption text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptSource {
    Youtube,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub source: TranscriptSource,
    segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Segments are kept ordered by start time regardless of input order.
    pub fn new(
        video_id: impl Into<String>,
        language: impl Into<String>,
        source: TranscriptSource,
        mut segments: Vec<TranscriptSegment>,
    ) -> Self {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self {
            video_id: video_id.into(),
            language: language.into(),
            source,
            segments,
        }
    }

    /// Builds a transcript from an uploaded plain-text document, one segment per line.
    pub fn from_document(name: &str, content: &str) -> Self {
        let segments = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| TranscriptSegment::new(i as f64, 0.0, line))
            .collect();

        Self::new(
            document_id(name),
            "und",
            TranscriptSource::Document,
            segments,
        )
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    /// Concatenated prompt text.
    pub fn text(&self) -> String {
        format::plain(self)
    }
}

pub trait TranscriptProvider {
    fn fetch(&self, video_id: &str) -> impl Future<Output = Result<Transcript>> + Send;
}

#[derive(Clone)]
pub struct YoutubeTranscripts {
    api: YouTubeTranscriptApi,
    languages: Vec<String>,
}

impl YoutubeTranscripts {
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::custom(format!("Failed to initialise transcript client: {e}")))?;
        Ok(Self { api, languages })
    }
}

impl TranscriptProvider for YoutubeTranscripts {
    async fn fetch(&self, video_id: &str) -> Result<Transcript> {
        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();
        tracing::debug!(video_id, ?languages, "fetching transcript");

        let fetched = self
            .api
            .fetch_transcript(video_id, &languages, false)
            .await
            .map_err(|e| {
                tracing::warn!(video_id, error = %e, "transcript provider failed");
                Error::TranscriptUnavailable(e.to_string())
            })?;

        let segments: Vec<TranscriptSegment> = fetched
            .snippets
            .iter()
            .map(|s| TranscriptSegment::new(s.start, s.duration, s.text.clone()))
            .collect();

        let transcript = Transcript::new(
            video_id,
            fetched.language_code.clone(),
            TranscriptSource::Youtube,
            segments,
        );
        if transcript.is_empty() {
            return Err(Error::TranscriptUnavailable(format!(
                "video {video_id} has an empty transcript"
            )));
        }

        tracing::info!(
            video_id,
            segments = transcript.segments().len(),
            language = %transcript.language,
            "transcript fetched"
        );
        Ok(transcript)
    }
}

/// Extracts the 11-character video identifier from a watch, share, embed or
/// shorts URL, or accepts a bare identifier.
pub fn extract_video_id(url: &str) -> Result<String> {
    let input = url.trim();

    if BARE_VIDEO_ID.is_match(input) {
        return Ok(input.to_string());
    }

    URL_VIDEO_ID
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| id.len() == VIDEO_ID_LEN)
        .ok_or_else(|| Error::InvalidUrl(input.to_string()))
}

/// Ensure a video identifier is safe for downstream use (filesystem paths, API calls, etc.).
/// Only ASCII alphanumeric characters plus `_` and `-` are allowed.
pub fn sanitize_video_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(Error::custom("Video ID cannot be empty"));
    }

    if trimmed.len() > MAX_VIDEO_ID_LEN {
        return Err(Error::custom("Video ID is unexpectedly long"));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(Error::custom(
            "Video ID contains unsupported characters; expected only letters, numbers, '-' or '_'",
        ));
    }

    Ok(trimmed.to_string())
}

/// Identifier for an uploaded document, derived from its file name.
fn document_id(name: &str) -> String {
    let stem = std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    let id: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_VIDEO_ID_LEN - 4)
        .collect();

    if id.is_empty() {
        "doc-untitled".to_string()
    } else {
        format!("doc-{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_expected_characters() {
        let id = sanitize_video_id("abcDEF123-_x").expect("valid ID");
        assert_eq!(id, "abcDEF123-_x");
    }

    #[test]
    fn rejects_empty() {
        assert!(sanitize_video_id("   ").is_err());
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(sanitize_video_id("abc/../../etc").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_VIDEO_ID_LEN + 1);
        assert!(sanitize_video_id(&long).is_err());
    }

    #[test]
    fn extracts_from_watch_url() {
        let id = extract_video_id("https://youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn extraction_ignores_surrounding_query_parameters() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?list=PL123&index=2&v=dQw4w9WgXcQ&ab_channel=x",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ#comments",
            "youtube.com/watch?v=dQw4w9WgXcQ",
        ];
        for url in urls {
            assert_eq!(extract_video_id(url).unwrap(), "dQw4w9WgXcQ", "{url}");
        }
    }

    #[test]
    fn extracts_from_share_and_embed_urls() {
        let urls = [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=Ab12Cd34&t=3",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "  dQw4w9WgXcQ  ",
        ];
        for url in urls {
            assert_eq!(extract_video_id(url).unwrap(), "dQw4w9WgXcQ", "{url}");
        }
    }

    #[test]
    fn rejects_urls_without_an_identifier() {
        for url in [
            "https://example.com/video",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQQ",
            "https://www.youtube.com/channel/UC123",
            "",
        ] {
            assert!(
                matches!(extract_video_id(url), Err(Error::InvalidUrl(_))),
                "{url}"
            );
        }
    }

    #[test]
    fn segments_are_ordered_by_start_time() {
        let transcript = Transcript::new(
            "dQw4w9WgXcQ",
            "en",
            TranscriptSource::Youtube,
            vec![
                TranscriptSegment::new(1.2, 1.0, "gonna give you up"),
                TranscriptSegment::new(0.0, 1.2, "Never"),
            ],
        );
        let texts: Vec<&str> = transcript
            .segments()
            .iter()
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(texts, ["Never", "gonna give you up"]);
    }

    #[test]
    fn document_lines_become_segments() {
        let transcript = Transcript::from_document("notes v2.txt", "first line\n\n  second  \n");
        assert_eq!(transcript.video_id, "doc-notes_v2");
        assert_eq!(transcript.source, TranscriptSource::Document);
        assert_eq!(transcript.segments().len(), 2);
        assert_eq!(transcript.text(), "first line second");
    }

    #[test]
    fn whitespace_only_transcript_is_empty() {
        let transcript = Transcript::from_document("blank.txt", "   \n\t\n");
        assert!(transcript.is_empty());
    }
}
