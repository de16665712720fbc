use crate::core::conversation::{AnalysisRequest, ConversationTurn};
use crate::core::format::{char_len, truncate_to};
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

pub const SYSTEM_INSTRUCTION: &str = "You are an engaging, humorous expert YouTube content editor. \
You help a creator improve their channel: catchy titles, SEO-friendly tags, eye-catching \
thumbnail ideas, concrete suggestions for viewer engagement and retention, and segments \
with potential as short-form viral clips. Ground every answer in the video transcript \
provided as reference context, and quote it when pointing at a specific moment.";

/// The canned first request sent after a video is loaded.
pub const ANALYSIS_REQUEST: &str = "Your first task is to provide a concise 4-6 sentence summary of the \
transcript as if you were preparing an introduction for a personal blog post. Begin the summary with \
a phrase such as 'In this post' or 'In this interview', setting the stage for what the reader can expect.

Your second task is to answer the following inquiries in the form of bullet points:

1. Engaging Title: Propose a list of catchy and appealing titles that encapsulate the essence of the content.
2. SEO Tags: Identify a list of SEO-friendly tags that are relevant to the content and could improve its searchability.
3. Thumbnail Prompt: Generate a prompt that describes the elements of an eye-catching thumbnail that would compel viewers to click.
4. Content Enhancement: Offer specific suggestions on how the content could be improved for viewer engagement and retention.
5. Viral Segment: Identify the best section that might have the potential to be engaging or entertaining as a short-form viral video, based on humor, uniqueness, relatability or other notable elements.
6. Viral Segment Explanation: After you provide the segment, explain why.

Provide Summary Here:

Answer Tasks Here:";

const CONTEXT_OPEN: &str = "Reference transcript of the video:\n<transcript>";
const CONTEXT_CLOSE: &str = "</transcript>";
const TRUNCATION_MARKER: &str = "[transcript truncated]";

static THUMBNAIL_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)thumbnail\s+prompt[*_\s]*:(.*?)content\s+enhancement").expect("Invalid regex")
});

static TRAILING_ENUMERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d+\.$").expect("Invalid regex"));

/// Structured payload for the model endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Instruction first, then the transcript context block.
    pub system: Vec<String>,
    /// History followed by the new user message.
    pub messages: Vec<ConversationTurn>,
    pub transcript_truncated: bool,
}

impl ModelRequest {
    /// Size in characters, the unit of the input budget.
    pub fn size(&self) -> usize {
        self.system.iter().map(|s| char_len(s)).sum::<usize>()
            + self
                .messages
                .iter()
                .map(|m| char_len(&m.content))
                .sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instruction: String,
    budget_chars: usize,
}

impl PromptBuilder {
    pub fn new(budget_chars: usize) -> Self {
        Self {
            instruction: SYSTEM_INSTRUCTION.to_string(),
            budget_chars,
        }
    }

    /// Orders the payload as instruction, transcript, history, new message.
    /// Only the transcript is ever shortened to fit the budget.
    pub fn build(&self, request: &AnalysisRequest) -> Result<ModelRequest> {
        let wrapper = char_len(CONTEXT_OPEN) + char_len(CONTEXT_CLOSE) + 2;
        let conversation: usize = request
            .history
            .iter()
            .map(|t| char_len(&t.content))
            .sum::<usize>()
            + char_len(&request.new_message);
        let fixed = char_len(&self.instruction) + wrapper + conversation;

        if fixed > self.budget_chars {
            tracing::warn!(size = fixed, budget = self.budget_chars, "payload over budget");
            return Err(Error::PayloadTooLarge {
                size: fixed,
                budget: self.budget_chars,
            });
        }

        let room = self.budget_chars - fixed;
        let transcript_len = char_len(&request.transcript);
        let (transcript, truncated) = if transcript_len <= room {
            (request.transcript.clone(), false)
        } else {
            let marker_cost = char_len(TRUNCATION_MARKER) + 1;
            let text = if room < marker_cost {
                String::new()
            } else {
                let head = truncate_to(&request.transcript, room - marker_cost);
                if head.is_empty() {
                    TRUNCATION_MARKER.to_string()
                } else {
                    format!("{head} {TRUNCATION_MARKER}")
                }
            };
            tracing::info!(
                original = transcript_len,
                kept = char_len(&text),
                budget = self.budget_chars,
                "transcript truncated to fit model input"
            );
            (text, true)
        };

        let mut messages = request.history.clone();
        messages.push(ConversationTurn::user(request.new_message.clone()));

        Ok(ModelRequest {
            system: vec![
                self.instruction.clone(),
                format!("{CONTEXT_OPEN}\n{transcript}\n{CONTEXT_CLOSE}"),
            ],
            messages,
            transcript_truncated: truncated,
        })
    }
}

/// Pulls the thumbnail design brief out of an analysis reply.
pub fn extract_thumbnail_prompt(reply: &str) -> Option<String> {
    let caps = THUMBNAIL_SECTION.captures(reply)?;
    let raw = caps.get(1)?.as_str();

    let is_decoration = |c: char| c.is_whitespace() || matches!(c, '*' | '_' | '#' | '-' | ':');
    let trimmed = raw.trim_matches(is_decoration);
    let trimmed = TRAILING_ENUMERATOR.replace(trimmed, "");
    let trimmed = trimmed.trim_matches(is_decoration);

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(transcript: &str, history: Vec<ConversationTurn>, message: &str) -> AnalysisRequest {
        AnalysisRequest {
            transcript: transcript.to_string(),
            history,
            new_message: message.to_string(),
        }
    }

    fn exchange(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .flat_map(|i| {
                [
                    ConversationTurn::user(format!("question {i}")),
                    ConversationTurn::assistant(format!("answer {i}")),
                ]
            })
            .collect()
    }

    #[test]
    fn preserves_order_of_parts() {
        let builder = PromptBuilder::new(100_000);
        let req = builder
            .build(&request("Never gonna give you up", exchange(1), "tags?"))
            .unwrap();

        assert_eq!(req.system[0], SYSTEM_INSTRUCTION);
        assert!(req.system[1].contains("<transcript>\nNever gonna give you up\n</transcript>"));
        let contents: Vec<&str> = req.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["question 0", "answer 0", "tags?"]);
        assert!(!req.transcript_truncated);
    }

    #[test]
    fn truncates_transcript_before_history() {
        let transcript = "word ".repeat(5_000);
        let history = exchange(3);
        let budget = 2_000;
        let builder = PromptBuilder::new(budget);

        let req = builder
            .build(&request(&transcript, history.clone(), "thumbnail?"))
            .unwrap();

        assert!(req.size() <= budget, "size {} > {budget}", req.size());
        assert!(req.transcript_truncated);
        assert!(req.system[1].contains(TRUNCATION_MARKER));
        assert_eq!(&req.messages[..history.len()], &history[..]);
        assert_eq!(req.messages.last().unwrap().content, "thumbnail?");
    }

    #[test]
    fn payload_fits_for_every_budget_above_fixed_cost() {
        let transcript = "lorem ipsum dolor sit amet ".repeat(100);
        let history = exchange(2);
        let probe = PromptBuilder::new(usize::MAX)
            .build(&request("", history.clone(), "go"))
            .unwrap()
            .size();

        for budget in probe..probe + 200 {
            let req = PromptBuilder::new(budget)
                .build(&request(&transcript, history.clone(), "go"))
                .unwrap();
            assert!(req.size() <= budget, "budget {budget} size {}", req.size());
            assert_eq!(req.messages.len(), history.len() + 1);
        }
    }

    #[test]
    fn rejects_when_history_alone_exceeds_budget() {
        let builder = PromptBuilder::new(SYSTEM_INSTRUCTION.len() + 10);
        let err = builder
            .build(&request("short", exchange(50), "more"))
            .unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { .. }));
    }

    #[test]
    fn extracts_thumbnail_section() {
        let reply = "Summary...\n\n1. Engaging Title: x\n2. SEO Tags: y\n\
                     3. Thumbnail Prompt: A shocked host holding a giant golden microphone, neon background.\n\
                     4. Content Enhancement: tighten the intro.";
        assert_eq!(
            extract_thumbnail_prompt(reply).as_deref(),
            Some("A shocked host holding a giant golden microphone, neon background.")
        );
    }

    #[test]
    fn extracts_thumbnail_section_with_markdown_emphasis() {
        let reply = "**Thumbnail Prompt**: Split screen, before and after.\n\n**Content Enhancement:** more b-roll";
        assert_eq!(
            extract_thumbnail_prompt(reply).as_deref(),
            Some("Split screen, before and after.")
        );
    }

    #[test]
    fn no_thumbnail_section_yields_none() {
        assert_eq!(extract_thumbnail_prompt("Just a chat reply."), None);
        assert_eq!(
            extract_thumbnail_prompt("Thumbnail Prompt: Content Enhancement: tips"),
            None
        );
    }
}
