use crate::core::conversation;
use crate::core::model::{DecodingConfig, ModelClient, classify_failure, code_in_message};
use crate::core::prompt::ModelRequest;
use crate::error::{Error, Result};
use async_openai::{
    self,
    error::OpenAIError,
    types::responses::{
        CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, Role,
    },
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::env;
use std::time::Duration;

const OPENAI_OPT_IN_ENV: &str = "YTADVISOR_ALLOW_OPENAI";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// OpenAI Responses API backend. Reads `OPENAI_API_KEY` from the environment.
#[derive(Clone)]
pub struct OpenAiClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    decoding: DecodingConfig,
}

impl OpenAiClient {
    pub fn new(model: impl Into<String>, decoding: DecodingConfig) -> Result<Self> {
        enforce_openai_opt_in()?;
        Ok(Self {
            client: async_openai::Client::new().with_backoff(no_retry()),
            model: model.into(),
            decoding,
        })
    }
}

impl ModelClient for OpenAiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<String> {
        let mut items = Vec::with_capacity(request.system.len() + request.messages.len());
        for block in &request.system {
            items.push(InputItem::EasyMessage(
                EasyInputMessageArgs::default()
                    .role(Role::System)
                    .content(block.clone())
                    .build()?,
            ));
        }
        for turn in &request.messages {
            let role = match turn.role {
                conversation::Role::User => Role::User,
                conversation::Role::Assistant => Role::Assistant,
            };
            items.push(InputItem::EasyMessage(
                EasyInputMessageArgs::default()
                    .role(role)
                    .content(turn.content.clone())
                    .build()?,
            ));
        }

        let request_body = CreateResponseArgs::default()
            .max_output_tokens(self.decoding.max_output_tokens)
            .temperature(self.decoding.temperature)
            .model(self.model.as_str())
            .input(InputParam::Items(items))
            .build()?;

        tracing::info!(model = %self.model, messages = request.messages.len(), "invoking openai");
        let response = self.client.responses().create(request_body).await?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    match c {
                        OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                        _ => {
                            tracing::debug!("skipping non-text content: {c:?}");
                            continue;
                        }
                    }
                }
            }
        }

        if content.trim().is_empty() {
            return Err(Error::Service("model returned no text content".to_string()));
        }
        Ok(content)
    }
}

impl From<OpenAIError> for Error {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::InvalidArgument(msg) => {
                Error::Service(format!("Invalid request: {msg}"))
            }
            other => {
                let message = other.to_string();
                classify_failure(code_in_message(&message), message)
            }
        }
    }
}

/// Rate-limited and 5xx responses come back on the first attempt.
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn enforce_openai_opt_in() -> Result<()> {
    match env::var(OPENAI_OPT_IN_ENV) {
        Ok(val)
            if matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ) =>
        {
            Ok(())
        }
        _ => Err(Error::Config(format!(
            "The OpenAI backend requires explicit opt-in. Set {OPENAI_OPT_IN_ENV}=1 to send transcripts to OpenAI."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::backoff::Backoff;

    #[test]
    fn failed_requests_are_not_retried() {
        let mut backoff = no_retry();
        assert_eq!(backoff.next_backoff(), None);
    }
}
