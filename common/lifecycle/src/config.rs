use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

use crate::coordinator::ShutdownOptions;
use crate::signals::{ParseShutdownSignalError, ShutdownSignal};

/// Shutdown settings read from the environment.
#[derive(Envconfig, Clone, Debug)]
pub struct ShutdownConfig {
    /// Deadline for all components to report completion, in milliseconds.
    #[envconfig(from = "SHUTDOWN_TIMEOUT", default = "5000")]
    pub timeout: EnvMsDuration,

    /// Delay between two polls of the completion signals, in milliseconds.
    #[envconfig(from = "SHUTDOWN_POLL_INTERVAL", default = "100")]
    pub poll_interval: EnvMsDuration,

    #[envconfig(from = "SHUTDOWN_SIGNALS", default = "SIGINT,SIGTERM")]
    pub signals: SignalList,

    #[envconfig(from = "SHUTDOWN_TRAP_SIGNALS", default = "true")]
    pub trap_signals: bool,
}

impl ShutdownConfig {
    pub fn init_with_defaults() -> Result<Self, envconfig::Error> {
        ShutdownConfig::init_from_env()
    }
}

impl From<ShutdownConfig> for ShutdownOptions {
    fn from(config: ShutdownConfig) -> Self {
        ShutdownOptions {
            timeout: config.timeout.0,
            poll_interval: config.poll_interval.0,
            signals: config.signals.0,
            trap_signals: config.trap_signals,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

/// Comma-separated list of signal names, e.g. `SIGINT,SIGTERM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalList(pub Vec<ShutdownSignal>);

impl FromStr for SignalList {
    type Err = ParseShutdownSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|name| !name.trim().is_empty())
            .map(ShutdownSignal::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(SignalList)
    }
}
