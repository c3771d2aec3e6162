use eyre::{Result, WrapErr};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Upper bound on handler pipelines in flight at once.
    pub max_concurrent_requests: usize,
    pub worker_threads: usize,
    /// Priority of submissions that don't set one. Lower is served first.
    pub default_priority: i32,
}

impl Default for LoaderConfig {
    fn default() -> LoaderConfig {
        LoaderConfig {
            max_concurrent_requests: 32,
            worker_threads: 4,
            default_priority: 1,
        }
    }
}

impl LoaderConfig {
    pub fn from_json(json: &str) -> Result<LoaderConfig> {
        serde_json::from_str(json).wrap_err("invalid loader config")
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> LoaderConfig {
        self.max_concurrent_requests = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = LoaderConfig::from_json(r#"{ "max_concurrent_requests": 2 }"#).unwrap();
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.default_priority, 1);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(LoaderConfig::from_json("{ max: }").is_err());
    }
}
