use anyhow::{Context, Result};
use log::error;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "./config.toml";

/// Defaults for the conversion commands. Command-line flags win over these.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub motlist_name: Option<String>,
    /// Reference motlist used to place bones in skeleton slots.
    pub reference: Option<PathBuf>,
    /// `bone name = skeleton index`
    pub overrides: BTreeMap<String, u16>,
    pub skip_prefixes: Option<Vec<String>>,
    pub axis_convert: bool,
    pub uncompressed: bool,
}

impl Config {
    /// An explicit `path` must exist. Without one, `./config.toml` is used when present.
    /// A file that does not parse is reported and replaced by the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let data = match path {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read config `{}`", path.display()))?,
            None => match fs::read_to_string(DEFAULT_CONFIG) {
                Ok(data) => data,
                Err(_) => return Ok(Self::default()),
            },
        };
        Ok(Self::parse(&data))
    }

    pub fn parse(data: &str) -> Self {
        match toml::from_str(data) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to parse config file: {}", e);
                Default::default()
            }
        }
    }
}
