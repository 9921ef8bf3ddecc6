//! Command line arguments layered over an optional TOML file.
//!
//! Every field has a default. A config file is read when `--config` names one
//! or when `hoverclip.toml` exists in the working directory; only the former
//! is an error when missing.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::views::Route;

pub const DEFAULT_CONFIG_FILE: &str = "hoverclip.toml";

/// Hover cube and clipped sphere viewer
#[derive(Parser, Debug, Default)]
#[command(name = "hoverclip", version, about = "Hover cube and clipped sphere viewer")]
pub struct Args {
    /// View shown at startup
    #[arg(short, long, value_enum)]
    pub view: Option<Route>,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for the sphere hues, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Initial window width in logical pixels
    #[arg(long)]
    pub width: Option<f32>,

    /// Initial window height in logical pixels
    #[arg(long)]
    pub height: Option<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Also write logs to a file, same as `HOVERCLIP_LOG=1`.
    pub file: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub start_view: Route,
    pub hue_seed: Option<u64>,
    pub window: WindowConfig,
    pub log: LogConfig,
}

impl ViewerConfig {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (explicit or default) first, then arguments on top.
    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_args(args);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(view) = args.view {
            self.start_view = view;
        }
        if let Some(seed) = args.seed {
            self.hue_seed = Some(seed);
        }
        if let Some(width) = args.width.filter(|w| *w > 0.0) {
            self.window.width = width;
        }
        if let Some(height) = args.height.filter(|h| *h > 0.0) {
            self.window.height = height;
        }
    }
}
