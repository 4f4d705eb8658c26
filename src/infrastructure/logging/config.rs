use std::str::FromStr;

use crate::domain::models::LoggingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => anyhow::bail!("Invalid log format: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

impl FromStr for RotationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => anyhow::bail!("Invalid log rotation: {other}"),
        }
    }
}

/// Parsed form of [`LoggingConfig`]
#[derive(Debug, Clone)]
pub struct LogSettings<'a> {
    pub level: &'a str,
    pub format: LogFormat,
    pub rotation: RotationPolicy,
}

impl<'a> LogSettings<'a> {
    pub fn parse(config: &'a LoggingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            level: &config.level,
            format: config.format.parse()?,
            rotation: config.rotation.parse()?,
        })
    }
}
