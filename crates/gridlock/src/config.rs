//! Server configuration: defaults, environment overrides, validation.

use std::time::Duration;

use gridlock_room::RoomConfig;

/// Address used when neither `GRIDLOCK_ADDR` nor `PORT` is set.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// How long a finished game stays on screen before the board clears.
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(5);

/// How long a connection may stay silent before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub bind_addr: String,

    /// Delay between a game ending and its automatic reset.
    pub reset_delay: Duration,

    /// Idle limit per connection. `None` disables it.
    pub idle_timeout: Option<Duration>,

    /// Settings applied to every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            reset_delay: DEFAULT_RESET_DELAY,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment.
    ///
    /// | variable | meaning |
    /// |---|---|
    /// | `GRIDLOCK_ADDR` | full bind address, wins over `PORT` |
    /// | `PORT` | binds `0.0.0.0:$PORT` |
    /// | `GRIDLOCK_RESET_DELAY_MS` | auto-reset delay in milliseconds |
    /// | `GRIDLOCK_IDLE_TIMEOUT_SECS` | idle limit, `0` disables |
    /// | `GRIDLOCK_SPECTATORS` | `true`/`false`, whether third joiners watch |
    /// | `GRIDLOCK_MAX_SPECTATORS` | spectator cap per room, `0` = unlimited |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("GRIDLOCK_ADDR") {
            config.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = parse("PORT", &port)?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(ms) = lookup("GRIDLOCK_RESET_DELAY_MS") {
            config.reset_delay = Duration::from_millis(parse("GRIDLOCK_RESET_DELAY_MS", &ms)?);
        }

        if let Some(secs) = lookup("GRIDLOCK_IDLE_TIMEOUT_SECS") {
            let secs: u64 = parse("GRIDLOCK_IDLE_TIMEOUT_SECS", &secs)?;
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(flag) = lookup("GRIDLOCK_SPECTATORS") {
            config.room.allow_spectators = parse_flag("GRIDLOCK_SPECTATORS", &flag)?;
        }

        if let Some(max) = lookup("GRIDLOCK_MAX_SPECTATORS") {
            config.room.max_spectators = parse("GRIDLOCK_MAX_SPECTATORS", &max)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}
