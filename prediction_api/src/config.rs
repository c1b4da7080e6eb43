use crate::threshold::ThresholdPolicy;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3002
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How the classifier reports its confidence.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputConvention {
    /// First output element is the positive-class probability.
    #[default]
    Scalar,
    /// Output is `[negative, positive, ...]`; the second element is used.
    Vector,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// `http(s)://` URL or local path of the ONNX artifact. Unset leaves the model unloaded.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default)]
    pub output: OutputConvention,
    /// Upper bound on fetching a remote artifact.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_download_timeout_secs() -> u64 {
    60
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            location: None,
            num_instances: default_model_instances(),
            output: OutputConvention::default(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn is_remote(&self) -> bool {
        self.location
            .as_deref()
            .is_some_and(|l| l.starts_with("http://") || l.starts_with("https://"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreprocessConfig {
    #[serde(default = "default_target_size")]
    pub target_size: u32,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default)]
    pub strict_rgb: bool,
}

fn default_target_size() -> u32 {
    224
}

fn default_max_width() -> u32 {
    3000
}

fn default_max_height() -> u32 {
    4000
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            strict_rgb: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Binary,
    Percentage,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PredictionConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub cutoff: Option<f32>,
}

impl PredictionConfig {
    pub fn threshold_policy(&self) -> ThresholdPolicy {
        match self.policy {
            PolicyKind::Binary => ThresholdPolicy::BinaryCutoff {
                cutoff: self.cutoff.unwrap_or(0.5),
            },
            PolicyKind::Percentage => ThresholdPolicy::PercentageCutoff {
                cutoff: self.cutoff.unwrap_or(58.0),
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Fs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_collection() -> String {
    "predictions".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            root: default_store_root(),
            collection: default_collection(),
        }
    }
}

impl StoreConfig {
    pub fn collection_path(&self) -> PathBuf {
        self.root.join(&self.collection)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            other => Err(format!(
                "{} is not a supported minimum log level. Use `debug`, `info` or `warn`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    config.validate().map_err(config::ConfigError::Message)?;

    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.upload.max_bytes == 0 {
            return Err("upload.max_bytes must be greater than zero".into());
        }
        if self.preprocess.target_size == 0 {
            return Err("preprocess.target_size must be greater than zero".into());
        }
        if self.model.num_instances == 0 {
            return Err("model.num_instances must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Config>()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("server:\n  host: 127.0.0.1\nlog_level: info\n").unwrap();

        assert_eq!(config.server.get_address(), "127.0.0.1:3002");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.model.location.is_none());
        assert_eq!(config.upload.max_bytes, 1_048_576);
        assert_eq!(config.preprocess.target_size, 224);
        assert_eq!(config.preprocess.max_width, 3000);
        assert_eq!(config.preprocess.max_height, 4000);
        assert!(!config.preprocess.strict_rgb);
        assert_eq!(
            config.prediction.threshold_policy(),
            ThresholdPolicy::BinaryCutoff { cutoff: 0.5 }
        );
        assert_eq!(config.store.backend, StoreBackend::Fs);
        assert_eq!(config.store.collection_path(), PathBuf::from("data/predictions"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
server:
  host: 0.0.0.0
  port: 8080
log_level: DEBUG
model:
  location: https://example.com/model.onnx
  num_instances: 2
  output: vector
upload:
  max_bytes: 2048
preprocess:
  strict_rgb: true
prediction:
  policy: percentage
store:
  backend: memory
"#;
        let config = parse(yaml).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.model.is_remote());
        assert_eq!(config.model.num_instances, 2);
        assert_eq!(config.model.output, OutputConvention::Vector);
        assert_eq!(config.upload.max_bytes, 2048);
        assert!(config.preprocess.strict_rgb);
        assert_eq!(
            config.prediction.threshold_policy(),
            ThresholdPolicy::PercentageCutoff { cutoff: 58.0 }
        );
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_local_model_path_is_not_remote() {
        let config = parse(
            "server:\n  host: 127.0.0.1\nlog_level: info\nmodel:\n  location: models/model.onnx\n",
        )
        .unwrap();

        assert!(!config.model.is_remote());
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(parse("server:\n  host: 127.0.0.1\nlog_level: trace\n").is_err());
    }

    #[test]
    fn test_zero_upload_limit_fails_validation() {
        let config =
            parse("server:\n  host: 127.0.0.1\nlog_level: info\nupload:\n  max_bytes: 0\n")
                .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_parsing() {
        let env: Environment = "Production".to_string().try_into().unwrap();
        assert_eq!(env.as_str(), "production");
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
