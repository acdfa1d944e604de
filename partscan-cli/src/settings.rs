use clap::Args;
use partscan_gemini::{discover_api_keys, ClientConfig, GeminiClient, DEFAULT_MODEL};
use partscan_pipeline::brand::{
    discover_config_file, BrandCatalog, BrandProfile, FORMATS_ENV_VAR, FORMATS_FILE,
    PROMPTS_ENV_VAR, PROMPTS_FILE,
};
use partscan_pipeline::config::PipelineConfig;
use std::path::PathBuf;

use crate::errors::CliError;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Car brand whose prompts and formats apply (case-insensitive)
    #[arg(long, alias = "car-brand")]
    pub brand: String,

    /// API keys, comma separated or repeated. Falls back to GEMINI_API_KEYS / GEMINI_API_KEY
    #[arg(long = "api-keys", num_args = 1..)]
    pub api_keys: Vec<String>,

    /// Gemini model name
    #[arg(long, alias = "gemini-model", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Path to prompts.json
    #[arg(long)]
    pub prompts: Option<PathBuf>,

    /// Path to formats.json
    #[arg(long)]
    pub formats: Option<PathBuf>,

    /// Extraction attempts per image
    #[arg(long, default_value_t = 2)]
    pub max_attempts: usize,
}

impl CommonArgs {
    /// Resolved API keys.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Gemini` when no key is configured anywhere.
    pub fn api_keys(&self) -> Result<Vec<String>, CliError> {
        Ok(discover_api_keys(self.api_keys.clone())?)
    }

    /// A Gemini client for the selected model.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Gemini` if the client cannot be built.
    pub fn client(&self) -> Result<GeminiClient, CliError> {
        Ok(GeminiClient::new(
            ClientConfig::default().with_model(self.model.clone()),
        )?)
    }

    /// Loads the brand catalog and resolves the selected brand.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Pipeline` if a configuration file is unreadable or malformed.
    pub fn profile(&self) -> Result<BrandProfile, CliError> {
        let prompts = discover_config_file(self.prompts.clone(), PROMPTS_ENV_VAR, PROMPTS_FILE);
        let formats = discover_config_file(self.formats.clone(), FORMATS_ENV_VAR, FORMATS_FILE);
        let catalog = BrandCatalog::load(prompts.as_deref(), formats.as_deref())?;
        Ok(catalog.resolve(&self.brand))
    }

    /// State machine configuration from the flags.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidArgs` when `--max-attempts` is zero.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, CliError> {
        if self.max_attempts == 0 {
            return Err(CliError::InvalidArgs(
                "--max-attempts must be at least 1".to_string(),
            ));
        }
        Ok(PipelineConfig::default().with_max_attempts(self.max_attempts))
    }
}
