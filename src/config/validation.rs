use anyhow::Result;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use garde::Validate;
use std::path::PathBuf;

use super::AppConfig;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fhir-cache-probe", version, about = "Measure FHIR server cache latency")]
pub struct Cli {
    /// Path to an additional configuration file
    #[arg(long, env = "PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// FHIR server base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// File with one search value per line
    #[arg(long)]
    pub filter_list: Option<String>,

    /// Environment name
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Skip the demographic report and only run the cache batches
    #[arg(long)]
    pub skip_report: bool,
}

/// Load configuration from CLI arguments and the layered sources
pub fn load_config() -> Result<AppConfig> {
    load_config_with(&Cli::parse())
}

/// Load configuration with precedence, lowest first:
/// defaults, `config/default.toml`, `config/{environment}.toml`,
/// `--config` file, `PROBE_*` environment variables, CLI flags
pub fn load_config_with(cli: &Cli) -> Result<AppConfig> {
    let env_name = cli
        .environment
        .clone()
        .or_else(|| std::env::var("ENVIRONMENT").ok())
        .unwrap_or_else(|| "development".to_string());

    let mut figment = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file("config/default.toml"))
        .merge(Toml::file(format!("config/{}.toml", env_name)));

    if let Some(path) = &cli.config {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(Env::prefixed("PROBE_").split("__"))
        .merge(Serialized::default("environment", &env_name));

    if let Some(base_url) = &cli.base_url {
        figment = figment.merge(Serialized::default("server.base_url", base_url));
    }
    if let Some(filter_list) = &cli.filter_list {
        figment = figment.merge(Serialized::default("batch.filter_list_path", filter_list));
    }
    if cli.debug {
        figment = figment.merge(Serialized::default("logging.level", "debug"));
    }

    let config: AppConfig = figment.extract()?;

    config.validate()?;

    Ok(config)
}
