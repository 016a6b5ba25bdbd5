use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use triageq_core::alarm::DEFAULT_AUTO_STOP;
use triageq_core::profile::Profile;
use triageq_core::protocol::VotSettings;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_SOUND_DIR: &str = "./sounds";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Behaviour of the monitor loop itself, independent of transport.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub alarm_auto_stop: Duration,
    pub vot: VotSettings,
    /// Discard fetch completions that arrive after a newer one.
    pub drop_stale_responses: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            alarm_auto_stop: DEFAULT_AUTO_STOP,
            vot: VotSettings::default(),
            drop_stale_responses: true,
        }
    }
}

/// Full runtime configuration for the monitor binary.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    /// External audio player command; `None` selects the silent player.
    pub player_cmd: Option<String>,
    pub sound_dir: PathBuf,
    pub log_format: LogFormat,
    pub settings: MonitorSettings,
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `TRIAGEQ_API_URL`         | `http://127.0.0.1:5000` |
    /// | `POLL_INTERVAL_MS`        | `200`                   |
    /// | `REQUEST_TIMEOUT_MS`      | `2000`                  |
    /// | `ALARM_AUTO_STOP_SECS`    | `30`                    |
    /// | `VOT_RECOVERY_DELAY_SECS` | `5`                     |
    /// | `VOT_RECOVERY_PROFILE`    | `Stable`                |
    /// | `DROP_STALE_RESPONSES`    | `true`                  |
    /// | `ALARM_PLAYER_CMD`        | unset (silent)          |
    /// | `ALARM_SOUND_DIR`         | `./sounds`              |
    /// | `LOG_FORMAT`              | `text`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("TRIAGEQ_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());

        let poll_interval = match parse_var::<u64>(&lookup, "POLL_INTERVAL_MS")? {
            Some(0) => return Err(invalid("POLL_INTERVAL_MS", "0")),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_POLL_INTERVAL,
        };
        let request_timeout = parse_var::<u64>(&lookup, "REQUEST_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let alarm_auto_stop = parse_var::<u64>(&lookup, "ALARM_AUTO_STOP_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_AUTO_STOP);

        let defaults = VotSettings::default();
        let vot = VotSettings {
            step: defaults.step,
            recovery_profile: parse_var::<Profile>(&lookup, "VOT_RECOVERY_PROFILE")?
                .unwrap_or(defaults.recovery_profile),
            recovery_delay: parse_var::<u64>(&lookup, "VOT_RECOVERY_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.recovery_delay),
        };

        let drop_stale_responses =
            parse_var::<bool>(&lookup, "DROP_STALE_RESPONSES")?.unwrap_or(true);

        let player_cmd = lookup("ALARM_PLAYER_CMD").filter(|cmd| !cmd.trim().is_empty());
        let sound_dir = lookup("ALARM_SOUND_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOUND_DIR));

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) => return Err(invalid("LOG_FORMAT", v)),
        };

        Ok(Self {
            api_url,
            request_timeout,
            player_cmd,
            sound_dir,
            log_format,
            settings: MonitorSettings {
                poll_interval,
                alarm_auto_stop,
                vot,
                drop_stale_responses,
            },
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(var, &raw)),
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
    }
}
