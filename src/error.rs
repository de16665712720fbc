use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    /// No YouTube video identifier could be found in the input.
    #[display("Invalid YouTube URL: {_0}")]
    InvalidUrl(String),

    /// The provider has no usable captions for the video.
    #[display("Transcript unavailable: {_0}")]
    TranscriptUnavailable(String),

    /// The request cannot fit the model input budget even without transcript text.
    #[display("Request too large for the model: {size} characters, budget is {budget}")]
    PayloadTooLarge { size: usize, budget: usize },

    #[display("Authentication with the model endpoint failed: {_0}")]
    Auth(String),

    #[display("Rate limited by the model endpoint: {_0}")]
    RateLimited(String),

    #[display("Model endpoint error: {_0}")]
    Service(String),

    /// An event arrived in a session state that does not accept it.
    #[display("{_0}")]
    InvalidState(String),

    #[display("Configuration error: {_0}")]
    Config(String),

    #[from]
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    #[from]
    #[display("JSON error: {_0}")]
    Json(serde_json::Error),

    #[display("{_0}")]
    Custom(String),
}

impl Error {
    pub fn custom(val: impl std::fmt::Display) -> Self {
        Self::Custom(val.to_string())
    }

    /// Text shown to the user when a request fails.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidUrl(_) => format!("{self}. Paste a youtube.com or youtu.be link."),
            Error::RateLimited(_) => {
                format!("{self}. Wait a moment and send the message again.")
            }
            Error::Auth(_) => format!("{self}. Check your cloud credentials and region."),
            Error::PayloadTooLarge { .. } => {
                format!("{self}. Clear the conversation or shorten the message.")
            }
            _ => self.to_string(),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}
