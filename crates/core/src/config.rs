use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gates::{FrequencyPolicy, DEFAULT_BLOCKED_KEYWORDS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub placement: PlacementConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Model used for the cheap receptivity classification.
    pub decision_model: String,
    /// Model used for orchestration and final narration.
    pub creative_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub base_url: String,
    pub collection: String,
    pub top_k: usize,
}

#[derive(Clone, Debug)]
pub struct PlacementConfig {
    pub max_ads_per_session: u32,
    pub min_turns_between_ads: u32,
    pub cooldown_seconds: i64,
    pub session_ttl_secs: u64,
    pub blocked_keywords: Vec<String>,
}

impl PlacementConfig {
    pub fn frequency_policy(&self) -> FrequencyPolicy {
        FrequencyPolicy {
            max_ads_per_session: self.max_ads_per_session,
            min_turns_between_ads: self.min_turns_between_ads,
            cooldown_seconds: self.cooldown_seconds,
            session_ttl_secs: self.session_ttl_secs,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub retrieval_base_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8100,
                graceful_shutdown_secs: 15,
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: "https://api.openai.com".to_string(),
                decision_model: "gpt-4o".to_string(),
                creative_model: "gpt-4o".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            retrieval: RetrievalConfig {
                base_url: "http://localhost:8000".to_string(),
                collection: "adweave_products".to_string(),
                top_k: 5,
            },
            placement: PlacementConfig {
                max_ads_per_session: 15,
                min_turns_between_ads: 3,
                cooldown_seconds: 15,
                session_ttl_secs: 7_200,
                blocked_keywords: DEFAULT_BLOCKED_KEYWORDS
                    .iter()
                    .map(|keyword| keyword.to_string())
                    .collect(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("adweave.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(decision_model) = llm.decision_model {
                self.llm.decision_model = decision_model;
            }
            if let Some(creative_model) = llm.creative_model {
                self.llm.creative_model = creative_model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(base_url) = retrieval.base_url {
                self.retrieval.base_url = base_url;
            }
            if let Some(collection) = retrieval.collection {
                self.retrieval.collection = collection;
            }
            if let Some(top_k) = retrieval.top_k {
                self.retrieval.top_k = top_k;
            }
        }

        if let Some(placement) = patch.placement {
            if let Some(max_ads_per_session) = placement.max_ads_per_session {
                self.placement.max_ads_per_session = max_ads_per_session;
            }
            if let Some(min_turns_between_ads) = placement.min_turns_between_ads {
                self.placement.min_turns_between_ads = min_turns_between_ads;
            }
            if let Some(cooldown_seconds) = placement.cooldown_seconds {
                self.placement.cooldown_seconds = cooldown_seconds;
            }
            if let Some(session_ttl_secs) = placement.session_ttl_secs {
                self.placement.session_ttl_secs = session_ttl_secs;
            }
            if let Some(blocked_keywords) = placement.blocked_keywords {
                self.placement.blocked_keywords = blocked_keywords;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ADWEAVE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ADWEAVE_SERVER_PORT") {
            self.server.port = parse_u16("ADWEAVE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ADWEAVE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ADWEAVE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ADWEAVE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("ADWEAVE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ADWEAVE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("ADWEAVE_LLM_DECISION_MODEL") {
            self.llm.decision_model = value;
        }
        if let Some(value) = read_env("ADWEAVE_LLM_CREATIVE_MODEL") {
            self.llm.creative_model = value;
        }
        if let Some(value) = read_env("ADWEAVE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("ADWEAVE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ADWEAVE_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("ADWEAVE_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("ADWEAVE_RETRIEVAL_BASE_URL") {
            self.retrieval.base_url = value;
        }
        if let Some(value) = read_env("ADWEAVE_RETRIEVAL_COLLECTION") {
            self.retrieval.collection = value;
        }
        if let Some(value) = read_env("ADWEAVE_RETRIEVAL_TOP_K") {
            self.retrieval.top_k = parse_usize("ADWEAVE_RETRIEVAL_TOP_K", &value)?;
        }

        if let Some(value) = read_env("ADWEAVE_PLACEMENT_MAX_ADS_PER_SESSION") {
            self.placement.max_ads_per_session =
                parse_u32("ADWEAVE_PLACEMENT_MAX_ADS_PER_SESSION", &value)?;
        }
        if let Some(value) = read_env("ADWEAVE_PLACEMENT_MIN_TURNS_BETWEEN_ADS") {
            self.placement.min_turns_between_ads =
                parse_u32("ADWEAVE_PLACEMENT_MIN_TURNS_BETWEEN_ADS", &value)?;
        }
        if let Some(value) = read_env("ADWEAVE_PLACEMENT_COOLDOWN_SECONDS") {
            self.placement.cooldown_seconds =
                parse_i64("ADWEAVE_PLACEMENT_COOLDOWN_SECONDS", &value)?;
        }
        if let Some(value) = read_env("ADWEAVE_PLACEMENT_SESSION_TTL_SECS") {
            self.placement.session_ttl_secs =
                parse_u64("ADWEAVE_PLACEMENT_SESSION_TTL_SECS", &value)?;
        }

        let log_level =
            read_env("ADWEAVE_LOGGING_LEVEL").or_else(|| read_env("ADWEAVE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ADWEAVE_LOGGING_FORMAT").or_else(|| read_env("ADWEAVE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(retrieval_base_url) = overrides.retrieval_base_url {
            self.retrieval.base_url = retrieval_base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_llm(&self.llm)?;
        validate_retrieval(&self.retrieval)?;
        validate_placement(&self.placement)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("adweave.toml"), PathBuf::from("config/adweave.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be non-zero".to_string()));
    }
    if server.graceful_shutdown_secs == 0 || server.graceful_shutdown_secs > 300 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.provider != LlmProvider::Ollama {
        let missing = match &llm.api_key {
            Some(api_key) => api_key.expose_secret().is_empty(),
            None => true,
        };
        if missing {
            return Err(ConfigError::Validation(format!(
                "llm.api_key is required for provider {:?}; set ADWEAVE_LLM_API_KEY",
                llm.provider
            )));
        }
    }
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
    }
    if llm.decision_model.trim().is_empty() || llm.creative_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.decision_model and llm.creative_model must not be empty".to_string(),
        ));
    }
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if !retrieval.base_url.starts_with("http://") && !retrieval.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "retrieval.base_url must be an http(s) URL".to_string(),
        ));
    }
    if retrieval.collection.trim().is_empty() {
        return Err(ConfigError::Validation(
            "retrieval.collection must not be empty".to_string(),
        ));
    }
    if retrieval.top_k == 0 || retrieval.top_k > 50 {
        return Err(ConfigError::Validation(
            "retrieval.top_k must be in range 1..=50".to_string(),
        ));
    }
    Ok(())
}

fn validate_placement(placement: &PlacementConfig) -> Result<(), ConfigError> {
    if placement.max_ads_per_session == 0 {
        return Err(ConfigError::Validation(
            "placement.max_ads_per_session must be greater than zero".to_string(),
        ));
    }
    if placement.cooldown_seconds < 0 {
        return Err(ConfigError::Validation(
            "placement.cooldown_seconds must not be negative".to_string(),
        ));
    }
    if placement.session_ttl_secs < 60 {
        return Err(ConfigError::Validation(
            "placement.session_ttl_secs must be at least 60".to_string(),
        ));
    }
    if placement.blocked_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "placement.blocked_keywords must not contain empty entries".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if !LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.level `{}` is not one of trace|debug|info|warn|error",
            logging.level
        )));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    llm: Option<LlmPatch>,
    retrieval: Option<RetrievalPatch>,
    placement: Option<PlacementPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    decision_model: Option<String>,
    creative_model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    base_url: Option<String>,
    collection: Option<String>,
    top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PlacementPatch {
    max_ads_per_session: Option<u32>,
    min_turns_between_ads: Option<u32>,
    cooldown_seconds: Option<i64>,
    session_ttl_secs: Option<u64>,
    blocked_keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
