use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;

use crate::domain::{RetryPolicy, TerminalRecordPolicy};
use crate::util::persistence::default_data_file;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format {other:?}"),
        }
    }
}

/// Configuration parameters for the service.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    /// The port to listen for HTTP requests on.
    pub port: u16,
    /// Snapshot file for the record store; `None` keeps everything in memory.
    pub data_file: Option<PathBuf>,
    /// Where decisions are posted for the email automation.
    pub notification_webhook_url: String,
    pub notification_timeout: Duration,
    pub approval_retry: RetryPolicy,
    pub terminal_record_policy: TerminalRecordPolicy,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = parse_or(var("PORT"), 8080_u16).context("PORT must be a port number")?;
        let bind_address = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string());
        let data_file = var("DATA_FILE").map(PathBuf::from).or_else(default_data_file);

        let notification_webhook_url = var("NOTIFICATION_WEBHOOK_URL")
            .context("NOTIFICATION_WEBHOOK_URL must be provided")?;
        let notification_timeout = Duration::from_secs(
            parse_or(var("NOTIFICATION_TIMEOUT_SECS"), 10_u64)
                .context("NOTIFICATION_TIMEOUT_SECS must be a number of seconds")?,
        );

        let defaults = RetryPolicy::default();
        let approval_retry = RetryPolicy {
            attempts: parse_or(var("APPROVAL_RETRY_ATTEMPTS"), defaults.attempts)
                .context("APPROVAL_RETRY_ATTEMPTS must be a positive number")?
                .max(1),
            delay: parse_or(var("APPROVAL_RETRY_DELAY_MS"), defaults.delay.as_millis() as u64)
                .map(Duration::from_millis)
                .context("APPROVAL_RETRY_DELAY_MS must be a number of milliseconds")?,
        };

        let terminal_record_policy =
            parse_or(var("TERMINAL_RECORD_POLICY"), TerminalRecordPolicy::default())
                .context("TERMINAL_RECORD_POLICY must be `open` or `frozen`")?;
        let log_format = parse_or(var("LOG_FORMAT"), LogFormat::default())?;

        Ok(Config {
            bind_address,
            port,
            data_file,
            notification_webhook_url,
            notification_timeout,
            approval_retry,
            terminal_record_policy,
            log_format,
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("invalid value {raw:?}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[("NOTIFICATION_WEBHOOK_URL", "http://localhost:5678/hook")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.notification_timeout, Duration::from_secs(10));
        assert_eq!(config.approval_retry, RetryPolicy::default());
        assert_eq!(config.terminal_record_policy, TerminalRecordPolicy::Open);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("NOTIFICATION_WEBHOOK_URL", "http://localhost:5678/hook"),
            ("PORT", "9000"),
            ("BIND_ADDRESS", "127.0.0.1"),
            ("DATA_FILE", "/tmp/leads.json"),
            ("APPROVAL_RETRY_ATTEMPTS", "5"),
            ("APPROVAL_RETRY_DELAY_MS", "50"),
            ("TERMINAL_RECORD_POLICY", "frozen"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.listen_address(), "127.0.0.1:9000");
        assert_eq!(config.data_file, Some(PathBuf::from("/tmp/leads.json")));
        assert_eq!(config.approval_retry.attempts, 5);
        assert_eq!(config.approval_retry.delay, Duration::from_millis(50));
        assert_eq!(config.terminal_record_policy, TerminalRecordPolicy::Frozen);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn missing_webhook_url_is_an_error() {
        assert!(config(&[]).is_err());
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(config(&[
            ("NOTIFICATION_WEBHOOK_URL", "http://localhost/hook"),
            ("PORT", "eighty"),
        ])
        .is_err());
    }
}
