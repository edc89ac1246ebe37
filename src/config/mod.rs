//! Configuration module for naivesocks
//!
//! JSON files in the shadowsocks-style layout are the default; files ending
//! in `.toml` are parsed as TOML.

mod tcp;
mod tunnel;

pub use tcp::TcpConfig;
pub use tunnel::{Config, Overrides};

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a JSON or TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    if is_toml {
        parse_toml_config(&content)
    } else {
        parse_config(&content)
    }
}

/// Parse configuration from a JSON string
pub fn parse_config(content: &str) -> Result<Config> {
    serde_json::from_str(content).with_context(|| "Failed to parse configuration")
}

/// Parse configuration from a TOML string
pub fn parse_toml_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}
