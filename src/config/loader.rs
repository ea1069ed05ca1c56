//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{ServiceConfig, TokenConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listener port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Environment variable {0} must hold a non-empty signing secret")]
    MissingSecret(String),

    #[error("Invalid PORT value '{0}'")]
    InvalidPort(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` when given, otherwise start from defaults, then apply
/// environment overrides and validate the result.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    apply_port_override(&mut config, std::env::var(PORT_ENV).ok().as_deref())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Replace the port of the bind address, keeping its host.
pub fn apply_port_override(config: &mut ServiceConfig, port: Option<&str>) -> Result<(), ConfigError> {
    let Some(port) = port else {
        return Ok(());
    };
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;

    let host = config
        .listener
        .bind_address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or("0.0.0.0");
    config.listener.bind_address = format!("{host}:{port}");
    Ok(())
}

/// Read the signing secret from the environment variable named in the config.
pub fn read_secret(token: &TokenConfig) -> Result<String, ConfigError> {
    secret_from(&token.secret_env, std::env::var(&token.secret_env).ok())
}

fn secret_from(var: &str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(secret) if !secret.trim().is_empty() => Ok(secret),
        _ => Err(ConfigError::MissingSecret(var.to_string())),
    }
}
