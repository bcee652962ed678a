use std::env;
use std::path::PathBuf;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Runtime configuration for a [`crate::router::SessionRouter`].
///
/// Durations are carried as integer fields so the config can round-trip
/// through JSON and environment variables; use the accessor methods when a
/// `Duration` is needed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long to wait for the consumer to produce an answer, in milliseconds.
    pub answer_timeout_ms: u64,
    /// How long a session may sit without a new turn before it counts as
    /// abandoned, in milliseconds.
    pub session_idle_ms: u64,
    /// How often the idle sweeper runs, in milliseconds.
    pub sweep_interval_ms: u64,
    /// Spoken when the consumer produced no answer in time.
    pub no_answer_text: String,
    /// Spoken when the consumer failed while producing an answer.
    pub failure_text: String,
    /// Spoken when an answer violated the response format rules.
    pub conflict_text: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            answer_timeout_ms: 5_000,
            session_idle_ms: 300_000,
            sweep_interval_ms: 30_000,
            no_answer_text: "Sorry, I did not get an answer in time. Please try again later."
                .to_string(),
            failure_text: "Sorry, something went wrong while handling your request.".to_string(),
            conflict_text: "Sorry, I cannot present that response.".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from the environment, falling back to defaults for
    /// anything unset. An optional `.env` file is loaded first.
    pub fn from_env(env_file: Option<PathBuf>) -> Self {
        match env_file {
            Some(path) if path.exists() => {
                dotenvy::from_path(&path).ok();
                info!("Loaded .env from {}", path.display());
            }
            Some(path) => {
                error!("could not load .env from {}", path.display());
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }

        let defaults = Self::default();
        Self {
            answer_timeout_ms: env_u64(
                "ACTION_BRIDGE_ANSWER_TIMEOUT_MS",
                defaults.answer_timeout_ms,
            ),
            session_idle_ms: env_u64("ACTION_BRIDGE_SESSION_IDLE_MS", defaults.session_idle_ms),
            sweep_interval_ms: env_u64(
                "ACTION_BRIDGE_SWEEP_INTERVAL_MS",
                defaults.sweep_interval_ms,
            ),
            no_answer_text: env_string("ACTION_BRIDGE_NO_ANSWER_TEXT", defaults.no_answer_text),
            failure_text: env_string("ACTION_BRIDGE_FAILURE_TEXT", defaults.failure_text),
            conflict_text: env_string("ACTION_BRIDGE_CONFLICT_TEXT", defaults.conflict_text),
        }
    }

    pub fn with_answer_timeout(mut self, timeout: Duration) -> Self {
        self.answer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle_ms = idle.as_millis() as u64;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_millis(self.answer_timeout_ms)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_millis(self.session_idle_ms)
    }

    /// Never zero: a pathological config must not spin the sweeper.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.answer_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.session_idle(), Duration::from_secs(300));
        assert!(!cfg.no_answer_text.is_empty());
        assert!(!cfg.failure_text.is_empty());
        assert!(!cfg.conflict_text.is_empty());
    }

    #[test]
    fn test_builder_setters() {
        let cfg = BridgeConfig::default()
            .with_answer_timeout(Duration::from_millis(250))
            .with_session_idle(Duration::from_secs(60))
            .with_sweep_interval(Duration::from_secs(5));
        assert_eq!(cfg.answer_timeout_ms, 250);
        assert_eq!(cfg.session_idle_ms, 60_000);
        assert_eq!(cfg.sweep_interval_ms, 5_000);
    }

    #[test]
    fn test_from_env_overrides() {
        let key = "ACTION_BRIDGE_ANSWER_TIMEOUT_MS";
        let backup = env::var(key).ok();

        unsafe { env::set_var(key, "1234") };
        let cfg = BridgeConfig::from_env(Some(PathBuf::from("/nonexistent.env")));
        assert_eq!(cfg.answer_timeout_ms, 1234);

        // Restore original value
        if let Some(v) = backup {
            unsafe { env::set_var(key, v) };
        } else {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn test_from_env_ignores_garbage() {
        let key = "ACTION_BRIDGE_SESSION_IDLE_MS";
        let backup = env::var(key).ok();

        unsafe { env::set_var(key, "not-a-number") };
        let cfg = BridgeConfig::from_env(Some(PathBuf::from("/nonexistent.env")));
        assert_eq!(cfg.session_idle_ms, BridgeConfig::default().session_idle_ms);

        if let Some(v) = backup {
            unsafe { env::set_var(key, v) };
        } else {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let cfg = BridgeConfig::default().with_answer_timeout(Duration::from_millis(750));
        let json = serde_json::to_string(&cfg).unwrap();
        let back: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.answer_timeout_ms, 750);
    }
}
