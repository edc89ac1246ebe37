//! Tunnel configuration
//!
//! One file configures both roles. The local relay uses every field; the
//! server relay ignores `server`, `local_port` and `ipv6`.

use super::TcpConfig;
use serde::{Deserialize, Serialize};

fn default_server() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8388
}

fn default_local_port() -> u16 {
    1080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Default handshake timeout in seconds
fn default_handshake_timeout() -> u64 {
    crate::helper::DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host of the server relay
    #[serde(default = "default_server")]
    pub server: String,

    /// Port the server relay listens on
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Port the local relay accepts SOCKS5 clients on
    #[serde(default = "default_local_port")]
    pub local_port: u16,

    /// Shared secret the substitution table is derived from
    #[serde(default)]
    pub password: String,

    /// Interface both relays listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Handshake timeout in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,

    /// Dial the server relay over IPv6 only
    #[serde(default)]
    pub ipv6: bool,

    /// TCP socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
            server_port: default_server_port(),
            local_port: default_local_port(),
            password: String::new(),
            bind_address: default_bind_address(),
            connect_timeout: default_connect_timeout(),
            handshake_timeout: default_handshake_timeout(),
            ipv6: false,
            tcp: TcpConfig::default(),
        }
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `-s`
    pub server: Option<String>,
    /// `-p`
    pub server_port: Option<u16>,
    /// `-l`
    pub local_port: Option<u16>,
    /// `-k`
    pub password: Option<String>,
    /// `-6`; can only switch IPv6 on
    pub ipv6: bool,
}

impl Config {
    /// Replace fields with every override that is set
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(server) = overrides.server {
            self.server = server;
        }
        if let Some(port) = overrides.server_port {
            self.server_port = port;
        }
        if let Some(port) = overrides.local_port {
            self.local_port = port;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        if overrides.ipv6 {
            self.ipv6 = true;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        if self.server.is_empty() {
            return Err("server must not be empty".to_string());
        }
        if self.server_port == 0 {
            return Err("server_port must not be 0".to_string());
        }
        if self.local_port == 0 {
            return Err("local_port must not be 0".to_string());
        }
        Ok(())
    }
}
