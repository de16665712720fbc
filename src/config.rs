use crate::core::{
    Backend, BedrockClient, DEFAULT_MODEL_ID, DEFAULT_OPENAI_MODEL, DecodingConfig, OpenAiClient,
    PromptBuilder, StorageService, YoutubeTranscripts,
};
use crate::error::{Error, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

const MIN_INPUT_BUDGET: usize = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Bedrock,
    Openai,
}

/// Settings shared by every command; each flag can also come from the environment.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Model endpoint to use
    #[arg(long, env = "YTADVISOR_BACKEND", value_enum, default_value_t = BackendKind::Bedrock, global = true)]
    pub backend: BackendKind,

    /// AWS region for Bedrock (falls back to the SDK default chain)
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Bedrock model identifier
    #[arg(long, env = "YTADVISOR_MODEL_ID", default_value = DEFAULT_MODEL_ID, global = true)]
    pub model_id: String,

    /// OpenAI model name, used with --backend openai
    #[arg(long, env = "YTADVISOR_OPENAI_MODEL", default_value = DEFAULT_OPENAI_MODEL, global = true)]
    pub openai_model: String,

    /// Sampling temperature
    #[arg(long, env = "YTADVISOR_TEMPERATURE", default_value_t = 1.0, global = true)]
    pub temperature: f32,

    /// Maximum tokens in each reply
    #[arg(long, env = "YTADVISOR_MAX_OUTPUT_TOKENS", default_value_t = 4096, global = true)]
    pub max_output_tokens: u32,

    /// Model input budget in characters; the transcript is truncated to fit
    #[arg(long, env = "YTADVISOR_INPUT_BUDGET", default_value_t = 400_000, global = true)]
    pub input_budget: usize,

    /// Preferred transcript languages (comma-separated)
    #[arg(short, long, env = "YTADVISOR_LANGUAGES", default_value = "en", global = true)]
    pub languages: String,

    /// Directory for downloaded transcripts, exports and logs
    #[arg(long, env = "YTADVISOR_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendKind,
    pub region: Option<String>,
    pub model_id: String,
    pub openai_model: String,
    pub decoding: DecodingConfig,
    pub input_budget: usize,
    pub languages: Vec<String>,
    pub data_dir: PathBuf,
}

impl TryFrom<SettingsArgs> for Settings {
    type Error = Error;

    fn try_from(args: SettingsArgs) -> Result<Self> {
        let max_temperature = match args.backend {
            BackendKind::Bedrock => 1.0,
            BackendKind::Openai => 2.0,
        };
        if !(0.0..=max_temperature).contains(&args.temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0 and {max_temperature}, got {}",
                args.temperature
            )));
        }
        if args.max_output_tokens == 0 {
            return Err(Error::Config("max output tokens must be positive".into()));
        }
        if args.input_budget < MIN_INPUT_BUDGET {
            return Err(Error::Config(format!(
                "input budget must be at least {MIN_INPUT_BUDGET} characters"
            )));
        }
        if args.model_id.trim().is_empty() {
            return Err(Error::Config("model id cannot be empty".into()));
        }

        let languages: Vec<String> = args
            .languages
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if languages.is_empty() {
            return Err(Error::Config("at least one transcript language is required".into()));
        }

        Ok(Self {
            backend: args.backend,
            region: args.region.filter(|r| !r.trim().is_empty()),
            model_id: args.model_id.trim().to_string(),
            openai_model: args.openai_model,
            decoding: DecodingConfig {
                temperature: args.temperature,
                max_output_tokens: args.max_output_tokens,
            },
            input_budget: args.input_budget,
            languages,
            data_dir: args.data_dir,
        })
    }
}

impl Settings {
    pub async fn connect_model(&self) -> Result<Backend> {
        match self.backend {
            BackendKind::Bedrock => Ok(Backend::Bedrock(
                BedrockClient::connect(self.region.clone(), self.model_id.clone(), self.decoding)
                    .await,
            )),
            BackendKind::Openai => Ok(Backend::OpenAi(OpenAiClient::new(
                self.openai_model.clone(),
                self.decoding,
            )?)),
        }
    }

    pub fn transcripts(&self) -> Result<YoutubeTranscripts> {
        YoutubeTranscripts::new(self.languages.clone())
    }

    pub fn prompts(&self) -> PromptBuilder {
        PromptBuilder::new(self.input_budget)
    }

    pub fn storage(&self) -> StorageService {
        StorageService::new(self.data_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: SettingsArgs,
    }

    /// Every env-backed flag is passed on the command line so the
    /// developer's environment cannot leak into the result.
    const BASELINE: [(&str, &str); 9] = [
        ("--backend", "bedrock"),
        ("--region", "us-east-1"),
        ("--model-id", DEFAULT_MODEL_ID),
        ("--openai-model", DEFAULT_OPENAI_MODEL),
        ("--temperature", "1.0"),
        ("--max-output-tokens", "4096"),
        ("--input-budget", "400000"),
        ("--languages", "en"),
        ("--data-dir", "."),
    ];

    fn parse(overrides: &[(&str, &str)]) -> Result<Settings> {
        let mut argv = vec!["ytadvisor"];
        for (flag, default) in BASELINE {
            let value = overrides
                .iter()
                .find(|(name, _)| *name == flag)
                .map_or(default, |(_, value)| *value);
            argv.extend([flag, value]);
        }
        Settings::try_from(Harness::parse_from(argv).settings)
    }

    #[test]
    fn baseline_matches_the_defaults() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.backend, BackendKind::Bedrock);
        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
        assert_eq!(settings.input_budget, 400_000);
        assert_eq!(settings.languages, ["en"]);
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        assert!(matches!(
            parse(&[("--backend", "bedrock"), ("--temperature", "1.5")]),
            Err(Error::Config(_))
        ));
        assert!(parse(&[("--backend", "openai"), ("--temperature", "1.5")]).is_ok());
    }

    #[test]
    fn splits_languages() {
        let settings = parse(&[("--languages", "en, es,,pt")]).unwrap();
        assert_eq!(settings.languages, ["en", "es", "pt"]);
    }

    #[test]
    fn rejects_tiny_budget() {
        assert!(parse(&[("--input-budget", "10")]).is_err());
    }

    #[test]
    fn rejects_blank_languages() {
        assert!(parse(&[("--languages", " , ")]).is_err());
    }
}
