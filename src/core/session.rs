//! Session state machine for one video analysis.
//!
//! The session owns the transcript and the turn history. It performs no I/O:
//! [`Session::handle`] validates an event, moves to the next state and returns
//! the [`Effect`] the caller has to run; the outcome of that effect is fed
//! back through [`Session::transcript_loaded`] or [`Session::response_received`].
//! Every reset bumps the epoch, and outcomes from an older epoch are dropped.

use crate::core::conversation::{AnalysisRequest, ConversationTurn, is_alternating};
use crate::core::transcript::{Transcript, extract_video_id};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingVideo,
    Ready,
    AwaitingModelResponse,
}

impl SessionState {
    /// Whether the UI should accept new input.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SessionState::AwaitingVideo | SessionState::AwaitingModelResponse
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingVideo => "fetching transcript",
            SessionState::Ready => "ready",
            SessionState::AwaitingModelResponse => "waiting for the model",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SubmitVideo(String),
    SubmitMessage(String),
    LoadDocument { name: String, content: String },
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoTicket {
    pub epoch: u64,
    pub video_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageTicket {
    pub epoch: u64,
    pub request: AnalysisRequest,
}

/// Work the caller must perform after an event is accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    FetchTranscript(VideoTicket),
    CallModel(MessageTicket),
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    epoch: u64,
    pending_video: Option<String>,
    transcript: Option<Transcript>,
    transcript_text: String,
    history: Vec<ConversationTurn>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript.is_some()
    }

    /// Video being fetched, or the one currently loaded.
    pub fn video_id(&self) -> Option<&str> {
        self.pending_video
            .as_deref()
            .or_else(|| self.transcript.as_ref().map(|t| t.video_id.as_str()))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<Effect> {
        match event {
            SessionEvent::SubmitVideo(url) => self.submit_video(&url).map(Effect::FetchTranscript),
            SessionEvent::SubmitMessage(text) => self.submit_message(&text).map(Effect::CallModel),
            SessionEvent::LoadDocument { name, content } => {
                self.load_document(&name, &content).map(|_| Effect::None)
            }
            SessionEvent::Clear => {
                self.clear();
                Ok(Effect::None)
            }
        }
    }

    /// Accepted in every state; always drops the current conversation.
    pub fn submit_video(&mut self, url: &str) -> Result<VideoTicket> {
        self.reset();

        let video_id = match extract_video_id(url) {
            Ok(id) => id,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::info!(video_id = %video_id, epoch = self.epoch, "video submitted");
        self.pending_video = Some(video_id.clone());
        self.state = SessionState::AwaitingVideo;

        Ok(VideoTicket {
            epoch: self.epoch,
            video_id,
        })
    }

    pub fn transcript_loaded(&mut self, epoch: u64, outcome: Result<Transcript>) -> Result<()> {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "dropping stale transcript result");
            return Ok(());
        }
        if self.state() != SessionState::AwaitingVideo {
            return Err(Error::InvalidState(format!(
                "No transcript was requested (session is {})",
                self.state()
            )));
        }

        self.pending_video = None;
        match outcome {
            Ok(transcript) => {
                self.install(transcript);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(self.fail(e))
            }
        }
    }

    /// Uses a plain-text document in place of a video transcript.
    pub fn load_document(&mut self, name: &str, content: &str) -> Result<()> {
        self.reset();

        let transcript = Transcript::from_document(name, content);
        if transcript.is_empty() {
            return Err(self.fail(Error::TranscriptUnavailable(format!(
                "document {name} is empty"
            ))));
        }

        tracing::info!(document = %transcript.video_id, "document loaded");
        self.install(transcript);
        Ok(())
    }

    /// Appends the user turn and hands out the request for the model.
    pub fn submit_message(&mut self, text: &str) -> Result<MessageTicket> {
        let state = self.state();
        if state != SessionState::Ready {
            let reason = match state {
                SessionState::Idle => "Load a video before sending messages".to_string(),
                busy => format!("Still {busy}; wait for it to finish"),
            };
            return Err(Error::InvalidState(reason));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidState("Message is empty".to_string()));
        }

        let request = AnalysisRequest {
            transcript: self.transcript_text.clone(),
            history: self.history.clone(),
            new_message: text.to_string(),
        };
        self.history.push(ConversationTurn::user(text));
        self.state = SessionState::AwaitingModelResponse;
        self.last_error = None;

        Ok(MessageTicket {
            epoch: self.epoch,
            request,
        })
    }

    /// A failed reply withdraws the pending user turn so history is left as it
    /// was before the message was submitted.
    pub fn response_received(&mut self, epoch: u64, outcome: Result<String>) -> Result<()> {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "dropping stale model response");
            return Ok(());
        }
        if self.state() != SessionState::AwaitingModelResponse {
            return Err(Error::InvalidState(format!(
                "No model response was expected (session is {})",
                self.state()
            )));
        }

        self.state = SessionState::Ready;
        match outcome {
            Ok(reply) => {
                self.history.push(ConversationTurn::assistant(reply));
                debug_assert!(is_alternating(&self.history));
                tracing::debug!(turns = self.history.len(), "assistant turn recorded");
                Ok(())
            }
            Err(e) => {
                self.history.pop();
                Err(self.fail(e))
            }
        }
    }

    pub fn clear(&mut self) {
        self.reset();
        tracing::info!(epoch = self.epoch, "conversation cleared");
    }

    fn install(&mut self, transcript: Transcript) {
        self.transcript_text = transcript.text();
        self.transcript = Some(transcript);
        self.state = SessionState::Ready;
        self.last_error = None;
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.state = SessionState::Idle;
        self.pending_video = None;
        self.transcript = None;
        self.transcript_text.clear();
        self.history.clear();
        self.last_error = None;
    }

    fn fail(&mut self, error: Error) -> Error {
        self.last_error = Some(error.user_message());
        error
    }
}
