use std::env;

use anyhow::{anyhow, Context};

use crate::models::IndexKind;
use crate::risk::DEFAULT_TREND_EPSILON;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub trend_epsilon: f64,
    pub default_index: IndexKind,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            trend_epsilon: DEFAULT_TREND_EPSILON,
            default_index: IndexKind::Geri,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Config::default();

        let trend_epsilon = match lookup("RISK_TREND_EPSILON") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid RISK_TREND_EPSILON value `{raw}`"))?,
            None => defaults.trend_epsilon,
        };

        let default_index = match lookup("RISK_DEFAULT_INDEX") {
            Some(raw) => raw
                .parse::<IndexKind>()
                .map_err(|e| anyhow!("invalid RISK_DEFAULT_INDEX: {e}"))?,
            None => defaults.default_index,
        };

        Ok(Config {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            trend_epsilon,
            default_index,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}
