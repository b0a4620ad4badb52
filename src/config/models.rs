use garde::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct AppConfig {
    #[garde(dive)]
    #[serde(default)]
    pub server: ServerConfig,

    #[garde(dive)]
    #[serde(default)]
    pub batch: BatchConfig,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,

    #[garde(skip)]
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[garde(length(min = 1), custom(validate_base_url))]
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[garde(length(min = 1))]
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[garde(length(min = 1))]
    #[serde(default = "default_search_parameter")]
    pub search_parameter: String,

    /// Value searched for the one-off demographic report
    #[garde(length(min = 1))]
    #[serde(default = "default_sample_value")]
    pub sample_value: String,

    #[garde(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://hapi.fhir.org/baseR4".to_string()
}

fn default_resource_type() -> String {
    "Patient".to_string()
}

fn default_search_parameter() -> String {
    "family".to_string()
}

fn default_sample_value() -> String {
    "SMITH".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            resource_type: default_resource_type(),
            search_parameter: default_search_parameter(),
            sample_value: default_sample_value(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BatchConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_filter_list_path")]
    pub filter_list_path: String,

    #[garde(range(min = 1))]
    #[serde(default)]
    pub expected_filter_count: Option<usize>,
}

fn default_filter_list_path() -> String {
    "config/family_names.txt".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            filter_list_path: default_filter_list_path(),
            expected_filter_count: Some(20),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

fn validate_base_url(value: &str, _: &()) -> garde::Result {
    let url = reqwest::Url::parse(value).map_err(|_| garde::Error::new("Invalid base URL"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(garde::Error::new(format!("Unsupported URL scheme '{other}'"))),
    }
}
