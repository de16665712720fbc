use crate::core::conversation::Role;
use crate::core::model::{DecodingConfig, ModelClient, classify_failure};
use crate::core::prompt::ModelRequest;
use crate::error::{Error, Result};
use aws_config::{BehaviorVersion, Region, retry::RetryConfig};
use aws_sdk_bedrockruntime::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata},
    types::{ContentBlock, ConversationRole, InferenceConfiguration, Message, SystemContentBlock},
};

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// Amazon Bedrock through the Converse API.
#[derive(Clone)]
pub struct BedrockClient {
    client: Client,
    model_id: String,
    decoding: DecodingConfig,
}

impl BedrockClient {
    /// Resolves credentials and region through the SDK default chain.
    /// SDK-level retries are switched off.
    pub async fn connect(
        region: Option<String>,
        model_id: impl Into<String>,
        decoding: DecodingConfig,
    ) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        let model_id = model_id.into();
        tracing::debug!(
            model_id = %model_id,
            region = ?config.region(),
            "bedrock client configured"
        );

        Self {
            client: Client::new(&config),
            model_id,
            decoding,
        }
    }
}

impl ModelClient for BedrockClient {
    async fn generate(&self, request: &ModelRequest) -> Result<String> {
        let inference = InferenceConfiguration::builder()
            .temperature(self.decoding.temperature)
            .max_tokens(i32::try_from(self.decoding.max_output_tokens).unwrap_or(i32::MAX))
            .build();

        let mut call = self
            .client
            .converse()
            .model_id(&self.model_id)
            .inference_config(inference);

        for block in &request.system {
            call = call.system(SystemContentBlock::Text(block.clone()));
        }
        for turn in &request.messages {
            let role = match turn.role {
                Role::User => ConversationRole::User,
                Role::Assistant => ConversationRole::Assistant,
            };
            let message = Message::builder()
                .role(role)
                .content(ContentBlock::Text(turn.content.clone()))
                .build()
                .map_err(|e| Error::Service(format!("Failed to build message: {e}")))?;
            call = call.messages(message);
        }

        tracing::info!(
            model_id = %self.model_id,
            messages = request.messages.len(),
            size = request.size(),
            "invoking bedrock"
        );

        let output = call.send().await.map_err(|e| {
            let message = e
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&e).to_string());
            classify_failure(e.code(), message)
        })?;

        if let Some(usage) = output.usage() {
            tracing::debug!(
                input_tokens = usage.input_tokens(),
                output_tokens = usage.output_tokens(),
                stop_reason = ?output.stop_reason(),
                "bedrock usage"
            );
        }

        let text = output
            .output()
            .and_then(|o| o.as_message().ok())
            .map(|message| {
                message
                    .content()
                    .iter()
                    .filter_map(|block| block.as_text().ok())
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::Service(
                "model returned no text content".to_string(),
            ));
        }

        Ok(text)
    }
}
