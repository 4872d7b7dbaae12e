use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::clock::DEFAULT_TICK_INTERVAL;

/// Client settings, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Websocket endpoint of the game server
    pub server_url: String,
    /// Game to join; a new game is created when unset
    pub game_id: Option<String>,
    pub tick_interval: Duration,
    /// How often to ask the server for a `time_sync`; `None` disables it
    pub sync_interval: Option<Duration>,
    pub start_time_minutes: u64,
    pub increment_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "ws://127.0.0.1:8080/ws".to_string(),
            game_id: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            sync_interval: Some(Duration::from_secs(5)),
            start_time_minutes: 10,
            increment_seconds: 0,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClientConfig::default();

        let default_tick_ms = defaults.tick_interval.as_millis() as u64;
        let tick_ms: u64 = parse_or(&lookup, "CHESS_TICK_MS", default_tick_ms);
        let sync_secs: u64 = parse_or(&lookup, "CHESS_SYNC_SECS", 5);

        ClientConfig {
            server_url: lookup("CHESS_SERVER_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.server_url),
            game_id: lookup("CHESS_GAME_ID").filter(|id| !id.trim().is_empty()),
            tick_interval: Duration::from_millis(tick_ms.max(1)),
            sync_interval: (sync_secs > 0).then(|| Duration::from_secs(sync_secs)),
            start_time_minutes: parse_or(
                &lookup,
                "CHESS_START_MINUTES",
                defaults.start_time_minutes,
            ),
            increment_seconds: parse_or(
                &lookup,
                "CHESS_INCREMENT_SECONDS",
                defaults.increment_seconds,
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}", key, raw);
                default
            }
        },
        None => default,
    }
}
