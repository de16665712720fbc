use crate::core::bedrock::BedrockClient;
use crate::core::openai::OpenAiClient;
use crate::core::prompt::ModelRequest;
use crate::error::{Error, Result};
use std::future::Future;

/// Fixed decoding parameters applied to every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_output_tokens: 4096,
        }
    }
}

/// A hosted model that turns a structured request into assistant text.
///
/// Implementations never retry; every failure goes back to the caller.
pub trait ModelClient {
    fn generate(&self, request: &ModelRequest) -> impl Future<Output = Result<String>> + Send;
}

/// The configured endpoint.
#[derive(Clone)]
pub enum Backend {
    Bedrock(BedrockClient),
    OpenAi(OpenAiClient),
}

impl ModelClient for Backend {
    async fn generate(&self, request: &ModelRequest) -> Result<String> {
        match self {
            Backend::Bedrock(client) => client.generate(request).await,
            Backend::OpenAi(client) => client.generate(request).await,
        }
    }
}

const AUTH_CODES: &[&str] = &[
    "accessdeniedexception",
    "unrecognizedclientexception",
    "expiredtokenexception",
    "expiredtoken",
    "invalidsignatureexception",
    "invalidclienttokenid",
    "missingauthenticationtokenexception",
    "invalid_api_key",
    "invalid_authentication",
    "insufficient_permissions",
];

const RATE_LIMIT_CODES: &[&str] = &[
    "throttlingexception",
    "throttling",
    "toomanyrequestsexception",
    "servicequotaexceededexception",
    "rate_limit_exceeded",
    "insufficient_quota",
];

/// Finds a known error code inside a free-form message, for clients that only
/// expose rendered errors.
pub fn code_in_message(message: &str) -> Option<&'static str> {
    let lowered = message.to_ascii_lowercase();
    AUTH_CODES
        .iter()
        .chain(RATE_LIMIT_CODES)
        .copied()
        .filter(|code| code.contains('_'))
        .find(|code| lowered.contains(code))
}

/// Maps an endpoint error code onto the error taxonomy.
pub fn classify_failure(code: Option<&str>, message: impl Into<String>) -> Error {
    let message = message.into();
    let normalized = code.map(|c| c.trim().to_ascii_lowercase());

    let error = match normalized.as_deref() {
        Some(c) if AUTH_CODES.contains(&c) => Error::Auth(message),
        Some(c) if RATE_LIMIT_CODES.contains(&c) => Error::RateLimited(message),
        None if message.to_ascii_lowercase().contains("credentials") => Error::Auth(message),
        _ => Error::Service(match code {
            Some(code) if !message.contains(code) => format!("{code}: {message}"),
            _ => message,
        }),
    };

    tracing::warn!(code = code.unwrap_or("none"), error = %error, "model call failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_codes_map_to_auth() {
        for code in ["AccessDeniedException", "ExpiredTokenException", "invalid_api_key"] {
            assert!(
                matches!(classify_failure(Some(code), "nope"), Error::Auth(m) if m == "nope"),
                "{code}"
            );
        }
    }

    #[test]
    fn throttling_codes_map_to_rate_limited() {
        for code in ["ThrottlingException", "ServiceQuotaExceededException", "rate_limit_exceeded"] {
            assert!(
                matches!(classify_failure(Some(code), "slow"), Error::RateLimited(_)),
                "{code}"
            );
        }
    }

    #[test]
    fn everything_else_is_a_service_error() {
        let err = classify_failure(Some("ValidationException"), "bad model id");
        assert!(matches!(&err, Error::Service(m) if m == "ValidationException: bad model id"));

        let err = classify_failure(None, "connection reset");
        assert!(matches!(&err, Error::Service(m) if m == "connection reset"));
    }

    #[test]
    fn missing_credentials_without_code_is_auth() {
        let err = classify_failure(None, "failed to load credentials from the provider chain");
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn finds_codes_embedded_in_messages() {
        assert_eq!(
            code_in_message("429 rate_limit_exceeded: Rate limit reached"),
            Some("rate_limit_exceeded")
        );
        assert_eq!(code_in_message("Incorrect API key (invalid_api_key)"), Some("invalid_api_key"));
        assert_eq!(code_in_message("model overloaded"), None);
    }
}
