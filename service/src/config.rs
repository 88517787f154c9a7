use anyhow::{bail, Context};
use std::str::FromStr;

pub const DEST_BUCKET_VAR: &str = "DEST_BUCKET";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Plain,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "plain" => Ok(LogFormat::Plain),
            other => bail!("unknown {LOG_FORMAT_VAR} {other:?}, expected json or plain"),
        }
    }
}

/// Read once at start-up and shared by every invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub destination_bucket: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let destination_bucket = lookup(DEST_BUCKET_VAR)
            .filter(|bucket| !bucket.trim().is_empty())
            .with_context(|| format!("{DEST_BUCKET_VAR} is not set"))?;

        let log_format = match lookup(LOG_FORMAT_VAR) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Config {
            destination_bucket,
            log_format,
        })
    }
}
