//! Application-level configuration loading, including the admin token and
//! default party capacity.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAMEDAY_BACK_CONFIG_PATH";
/// Environment variable that overrides the admin token from the file.
const ADMIN_TOKEN_ENV: &str = "GAMEDAY_BACK_ADMIN_TOKEN";
/// Capacity reported when neither config nor storage provide one.
const DEFAULT_TOTAL_PLAYERS: u32 = 10;
/// Cadence at which clients are told to poll for snapshots.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    admin_token: Option<String>,
    total_players: u32,
    poll_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults. `GAMEDAY_BACK_ADMIN_TOKEN` overrides the file's token.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Ok(token) = env::var(ADMIN_TOKEN_ENV) {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if config.admin_token.is_none() {
            warn!("no admin token configured; admin endpoints will reject every request");
        }

        config
    }

    /// Shared secret expected in the `X-Admin-Token` header, if any.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Party capacity reported when storage has no explicit value.
    pub fn total_players(&self) -> u32 {
        self.total_players
    }

    /// Snapshot polling cadence advertised to clients.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_token: None,
            total_players: DEFAULT_TOTAL_PLAYERS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    admin_token: Option<String>,
    total_players: Option<u32>,
    poll_interval_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            admin_token: value.admin_token.filter(|token| !token.is_empty()),
            total_players: value.total_players.unwrap_or(DEFAULT_TOTAL_PLAYERS),
            poll_interval: Duration::from_secs(
                value.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
