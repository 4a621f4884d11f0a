use std::{env, num::NonZeroUsize, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub data_dir: PathBuf,
    pub export_timeout: Duration,
    pub transcript_limit: usize,
    pub presence: String,
    pub stats_flush: Duration,
    pub message_cache: NonZeroUsize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let export_timeout = Duration::from_secs(parse_or(&lookup, "EXPORT_TIMEOUT_SECS", 60)?);
        let transcript_limit = parse_or(&lookup, "TRANSCRIPT_LIMIT", 5000)?;

        let presence = lookup("PRESENCE").unwrap_or_else(|| "over the pack".to_string());

        let stats_flush = Duration::from_secs(parse_or(&lookup, "STATS_FLUSH_SECS", 60)?.max(1));
        let message_cache = parse_or(&lookup, "MESSAGE_CACHE", 500)?;
        let message_cache = NonZeroUsize::new(message_cache).ok_or(ConfigError::Invalid {
            name: "MESSAGE_CACHE",
            value: message_cache.to_string(),
        })?;

        Ok(Self {
            discord_token,
            data_dir,
            export_timeout,
            transcript_limit,
            presence,
            stats_flush,
            message_cache,
        })
    }

    pub fn db_path(&self, name: &str) -> String {
        self.data_dir.join(format!("{name}.db")).display().to_string()
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.export_timeout, Duration::from_secs(60));
        assert_eq!(config.transcript_limit, 5000);
        assert_eq!(config.stats_flush, Duration::from_secs(60));
        assert_eq!(config.message_cache.get(), 500);
        assert_eq!(config.db_path("support"), PathBuf::from("data").join("support.db").display().to_string());
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DISCORD_TOKEN"))
        ));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("EXPORT_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "EXPORT_TIMEOUT_SECS", .. })
        ));
    }

    #[test]
    fn empty_message_cache_is_rejected() {
        let result = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc"), ("MESSAGE_CACHE", "0")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "MESSAGE_CACHE", .. })
        ));
    }
}
