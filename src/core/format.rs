use crate::core::transcript::Transcript;

/// Joins segment texts in chronological order with single spaces, dropping timestamps.
pub fn plain(transcript: &Transcript) -> String {
    let mut out = String::new();

    for segment in transcript.segments() {
        let cleaned = clean_text(&segment.text);
        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&cleaned);
    }

    out
}

/// One `[start - end] text` line per segment, for display and the download file.
pub fn timestamped(transcript: &Transcript) -> Vec<String> {
    transcript
        .segments()
        .iter()
        .map(|segment| {
            let start = format_timestamp(segment.start);
            let end = format_timestamp(segment.start + segment.duration);
            format!("[{start} - {end}] {}", clean_text(&segment.text))
        })
        .collect()
}

/// Keeps at most `max_chars` leading characters, backing off to the last
/// whitespace when the cut would land inside a word.
pub fn truncate_to(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };

    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return head.trim_end();
    }
    match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => head[..idx].trim_end(),
        _ => head,
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn clean_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1_000;
    let millis = total_millis % 1_000;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
    } else {
        format!("{minutes:02}:{secs:02}.{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::{TranscriptSegment, TranscriptSource};

    fn rickroll() -> Transcript {
        Transcript::new(
            "dQw4w9WgXcQ",
            "en",
            TranscriptSource::Youtube,
            vec![
                TranscriptSegment::new(0.0, 1.2, "Never"),
                TranscriptSegment::new(1.2, 2.3, "gonna give you up"),
            ],
        )
    }

    #[test]
    fn joins_segments_with_single_space() {
        assert_eq!(plain(&rickroll()), "Never gonna give you up");
    }

    #[test]
    fn formatting_is_idempotent() {
        let transcript = rickroll();
        assert_eq!(plain(&transcript), plain(&transcript));
    }

    #[test]
    fn decodes_entities_and_collapses_whitespace() {
        let transcript = Transcript::new(
            "abc",
            "en",
            TranscriptSource::Youtube,
            vec![
                TranscriptSegment::new(0.0, 1.0, "it&#39;s  a\ntest"),
                TranscriptSegment::new(1.0, 1.0, "   "),
                TranscriptSegment::new(2.0, 1.0, "Tom &amp; Jerry"),
            ],
        );
        assert_eq!(plain(&transcript), "it's a test Tom & Jerry");
    }

    #[test]
    fn empty_transcript_formats_to_empty_string() {
        let transcript = Transcript::new("abc", "en", TranscriptSource::Youtube, Vec::new());
        assert_eq!(plain(&transcript), "");
    }

    #[test]
    fn timestamped_lines_include_ranges() {
        let lines = timestamped(&rickroll());
        assert_eq!(lines[0], "[00:00.000 - 00:01.200] Never");
        assert_eq!(lines[1], "[00:01.200 - 00:03.500] gonna give you up");
    }

    #[test]
    fn timestamps_gain_hours_past_one_hour() {
        assert_eq!(format_timestamp(3_725.5), "01:02:05.500");
    }

    #[test]
    fn truncation_respects_budget_and_word_boundaries() {
        let text = "alpha beta gamma delta";
        assert_eq!(truncate_to(text, 100), text);
        assert_eq!(truncate_to(text, 13), "alpha beta");
        assert_eq!(truncate_to(text, 10), "alpha beta");
        assert_eq!(truncate_to(text, 3), "alp");
        assert_eq!(truncate_to(text, 0), "");
    }

    #[test]
    fn truncation_never_splits_multibyte_chars() {
        let text = "ñandú ñandú";
        let cut = truncate_to(text, 4);
        assert_eq!(cut, "ñand");
        assert!(char_len(cut) <= 4);
    }

    #[test]
    fn truncation_borrows_a_prefix_of_the_input() {
        let text = "alpha beta gamma";
        let cut = truncate_to(text, 12);
        assert_eq!(cut, "alpha beta");
        assert!(std::ptr::eq(cut.as_ptr(), text.as_ptr()));
    }
}
