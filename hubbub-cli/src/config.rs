//! Startup configuration: a YAML file overlaid by command-line flags.
//!
//! Precedence is flags over file over built-in defaults. A missing file
//! is the same as an empty one; a file that exists but does not parse is
//! a startup error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ArgMatches;
use hubbub_lib::constants::DEFAULT_VOLUME_PERCENT;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "hubbub.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: String,
    pub port: u16,
    pub secure: bool,
    pub channel: String,
    pub cookie: Option<String>,
    pub lang: String,
    pub volume: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "loult.family".to_string(),
            port: 80,
            secure: true,
            channel: String::new(),
            cookie: None,
            lang: "fr".to_string(),
            volume: DEFAULT_VOLUME_PERCENT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, reason: String },
    Parse { path: PathBuf, reason: String },
    InvalidFlag(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => {
                write!(f, "could not read {}: {}", path.display(), reason)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "could not parse {}: {}", path.display(), reason)
            }
            ConfigError::InvalidFlag(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a configuration file, treating a missing one as empty.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
        }
    };

    if text.trim().is_empty() {
        return Ok(Config::default());
    }

    serde_yaml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Resolve the effective configuration from the parsed command line.
pub fn resolve(args: &ArgMatches) -> Result<Config, ConfigError> {
    let path = args
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load(&path)?;
    apply_flags(&mut config, args)?;
    Ok(config)
}

fn apply_flags(config: &mut Config, args: &ArgMatches) -> Result<(), ConfigError> {
    if let Some(server) = args.get_one::<String>("server") {
        config.server = server.clone();
    }
    if let Some(port) = args.get_one::<String>("port") {
        config.port = port
            .parse()
            .map_err(|_| ConfigError::InvalidFlag(format!("port must be a number: {}", port)))?;
    }
    if args.get_flag("insecure") {
        config.secure = false;
    }
    if let Some(channel) = args.get_one::<String>("channel") {
        config.channel = channel.clone();
    }
    if let Some(cookie) = args.get_one::<String>("cookie") {
        config.cookie = Some(cookie.clone());
    }
    if let Some(volume) = args.get_one::<String>("volume") {
        config.volume = volume.parse().map_err(|_| {
            ConfigError::InvalidFlag(format!("volume must be a number in 0-100: {}", volume))
        })?;
    }
    Ok(())
}
