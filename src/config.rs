// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `API_KEY_DB_PATH` | redb file for API keys | unset (in-memory) |
//! | `ENTITLEMENTS_PATH` | JSON entitlement matrix | unset (standard matrix) |
//! | `PARTNER_WEBHOOK_SECRET` | HMAC secret for inbound partner webhooks | unset (rejects all) |
//! | `BOOTSTRAP_API_KEY` | Seeds an `internal` key with `*` permission | unset |
//! | `API_KEY_LOOKUP_TIMEOUT_SECS` | Bound on a credential lookup | `5` |
//! | `WEBHOOK_RETRY_INTERVAL_SECS` | Interval between retry sweeps | `60` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both or neither | unset (plain HTTP) |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::telemetry::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const API_KEY_DB_PATH_ENV: &str = "API_KEY_DB_PATH";
pub const ENTITLEMENTS_PATH_ENV: &str = "ENTITLEMENTS_PATH";

/// Shared secret partners sign inbound webhooks with.
///
/// When unset every inbound partner webhook is rejected with 401.
pub const PARTNER_WEBHOOK_SECRET_ENV: &str = "PARTNER_WEBHOOK_SECRET";

/// Token for an `internal` key with the `*` permission, inserted at startup
/// if no key with that token exists.
///
/// Provisioning endpoints require an internal key, so a fresh deployment
/// needs this to create its first partner keys.
pub const BOOTSTRAP_API_KEY_ENV: &str = "BOOTSTRAP_API_KEY";

pub const API_KEY_LOOKUP_TIMEOUT_ENV: &str = "API_KEY_LOOKUP_TIMEOUT_SECS";
pub const WEBHOOK_RETRY_INTERVAL_ENV: &str = "WEBHOOK_RETRY_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

/// PEM certificate chain and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub api_key_db_path: Option<PathBuf>,
    pub entitlements_path: Option<PathBuf>,
    pub partner_webhook_secret: Option<String>,
    pub bootstrap_api_key: Option<String>,
    pub api_key_lookup_timeout: Duration,
    pub webhook_retry_interval: Duration,
    pub tls: Option<TlsPaths>,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
                var: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_format: get(LOG_FORMAT_ENV)
                .map(|value| LogFormat::parse(&value))
                .unwrap_or_default(),
            api_key_db_path: get(API_KEY_DB_PATH_ENV).map(PathBuf::from),
            entitlements_path: get(ENTITLEMENTS_PATH_ENV).map(PathBuf::from),
            partner_webhook_secret: get(PARTNER_WEBHOOK_SECRET_ENV),
            bootstrap_api_key: get(BOOTSTRAP_API_KEY_ENV),
            api_key_lookup_timeout: seconds(
                API_KEY_LOOKUP_TIMEOUT_ENV,
                get(API_KEY_LOOKUP_TIMEOUT_ENV),
                DEFAULT_LOOKUP_TIMEOUT_SECS,
            )?,
            webhook_retry_interval: seconds(
                WEBHOOK_RETRY_INTERVAL_ENV,
                get(WEBHOOK_RETRY_INTERVAL_ENV),
                DEFAULT_RETRY_INTERVAL_SECS,
            )?,
            tls,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidBindAddress(addr))
    }
}

fn seconds(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default));
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}
