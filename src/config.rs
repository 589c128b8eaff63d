use crate::adapters::outbound::ApiClientConfig;
use crate::domain::value_objects::{AnnotationKeys, ResourceKind, DEFAULT_ANNOTATION_PREFIX};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Cluster API settings
    pub api_url: String,
    pub token: Option<String>,
    pub request_timeout_secs: u64,

    // Replication settings
    pub kinds: Vec<String>,
    pub annotation_prefix: String,
    pub resync_secs: u64,
    pub poll_secs: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8001".to_string(),
            token: None,
            request_timeout_secs: 30,
            kinds: vec!["configmap".to_string()],
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            resync_secs: 1800,
            poll_secs: 5,
            debug: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("REPLICATOR_API_URL must not be empty")]
    EmptyApiUrl,
    #[error("REPLICATOR_KINDS must name at least one kind")]
    NoKinds,
    #[error("unknown resource kind {0:?} (expected configmap or secret)")]
    UnknownKind(String),
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),
}

impl Config {
    /// Build a config from a variable lookup, falling back to defaults for
    /// unset or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |name: &str, default: u64| {
            lookup(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let api_url = lookup("REPLICATOR_API_URL").unwrap_or(defaults.api_url);

        let token = lookup("REPLICATOR_TOKEN").filter(|t| !t.is_empty());

        let request_timeout_secs =
            number("REPLICATOR_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs);

        let kinds = lookup("REPLICATOR_KINDS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.kinds);

        let annotation_prefix = lookup("REPLICATOR_ANNOTATION_PREFIX")
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.annotation_prefix);

        let resync_secs = number("REPLICATOR_RESYNC_SECS", defaults.resync_secs);

        let poll_secs = number("REPLICATOR_POLL_SECS", defaults.poll_secs);

        let debug = lookup("DEBUG").is_some();

        Self {
            api_url,
            token,
            request_timeout_secs,
            kinds,
            annotation_prefix,
            resync_secs,
            poll_secs,
            debug,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::EmptyApiUrl);
        }
        if self.kinds.is_empty() {
            return Err(ConfigError::NoKinds);
        }
        if let Some(bad) = self.kinds.iter().find(|k| ResourceKind::parse(k).is_none()) {
            return Err(ConfigError::UnknownKind(bad.clone()));
        }
        if self.resync_secs == 0 {
            return Err(ConfigError::ZeroPeriod("REPLICATOR_RESYNC_SECS"));
        }
        if self.poll_secs == 0 {
            return Err(ConfigError::ZeroPeriod("REPLICATOR_POLL_SECS"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroPeriod("REPLICATOR_REQUEST_TIMEOUT_SECS"));
        }
        Ok(())
    }

    /// Configured kinds, parsed and deduplicated in order. Unknown names are
    /// skipped; `validate` reports them.
    pub fn resource_kinds(&self) -> Vec<ResourceKind> {
        let mut kinds = Vec::new();
        for kind in self.kinds.iter().filter_map(|k| ResourceKind::parse(k)) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            api_url: self.api_url.clone(),
            bearer_token: self.token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn annotation_keys(&self) -> AnnotationKeys {
        AnnotationKeys::with_prefix(&self.annotation_prefix)
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(Config::from_lookup(|name| std::env::var(name).ok()))
}
