//! Type-safe builder for `SyncConfig` using the typestate pattern
//!
//! The Elasticsearch host is the only required field; `build()` is only
//! available once it has been set, and validates the whole configuration.

use std::marker::PhantomData;

use crate::search::elasticsearch::parse_host;
use crate::search::errors::{SyncError, SyncResult};

use super::types::SyncConfig;

/// Characters Elasticsearch refuses in index names
const FORBIDDEN_INDEX_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':', ' '];

/// Longest index name Elasticsearch accepts, in bytes
const MAX_INDEX_NAME_BYTES: usize = 255;

// Type states for the builder
pub struct WithHost;

pub struct SyncConfigBuilder<State = ()> {
    pub(crate) config: SyncConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for SyncConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: SyncConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl SyncConfig {
    /// Create a builder for configuring a `SyncConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> SyncConfigBuilder<()> {
        SyncConfigBuilder::default()
    }

    /// Check every field against what the queue and Elasticsearch accept
    pub fn validate(&self) -> SyncResult<()> {
        parse_host(&self.es_host)?;
        validate_index_name(&self.es_index)?;

        if self.debounce_ms == 0 {
            return Err(invalid("debounce_ms must be greater than zero"));
        }
        if self.max_buffer_delay_ms < self.debounce_ms {
            return Err(invalid(format!(
                "max_buffer_delay_ms ({}) must be at least debounce_ms ({})",
                self.max_buffer_delay_ms, self.debounce_ms
            )));
        }
        if self.reset_max_attempts == 0 {
            return Err(invalid("reset_max_attempts must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be greater than zero"));
        }
        if self.whitelist.is_some() && self.blacklist.is_some() {
            return Err(invalid("whitelist and blacklist cannot both be set"));
        }

        Ok(())
    }
}

impl SyncConfigBuilder<()> {
    pub fn es_host(self, host: impl Into<String>) -> SyncConfigBuilder<WithHost> {
        let mut config = self.config;
        config.es_host = host.into();
        SyncConfigBuilder {
            config,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when the host is set
impl SyncConfigBuilder<WithHost> {
    pub fn build(self) -> SyncResult<SyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn validate_index_name(name: &str) -> SyncResult<()> {
    if name.is_empty() {
        return Err(invalid("index name is empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid(format!("'{name}' is not a valid index name")));
    }
    if name.chars().any(char::is_uppercase) {
        return Err(invalid(format!("index name '{name}' must be lowercase")));
    }
    if name.starts_with(['-', '_', '+']) {
        return Err(invalid(format!(
            "index name '{name}' cannot start with '-', '_' or '+'"
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_INDEX_CHARS.contains(c)) {
        return Err(invalid(format!("index name '{name}' contains '{c}'")));
    }
    if name.len() > MAX_INDEX_NAME_BYTES {
        return Err(invalid(format!(
            "index name is longer than {MAX_INDEX_NAME_BYTES} bytes"
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> SyncError {
    SyncError::ConfigurationInvalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_rules() {
        assert!(validate_index_name("app_index").is_ok());
        assert!(validate_index_name("logs-2024.01").is_ok());
        assert!(validate_index_name("").is_err());
        assert!(validate_index_name("..").is_err());
        assert!(validate_index_name("App").is_err());
        assert!(validate_index_name("_hidden").is_err());
        assert!(validate_index_name("a b").is_err());
        assert!(validate_index_name("a/b").is_err());
        assert!(validate_index_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn build_requires_valid_timing() {
        let result = SyncConfig::builder()
            .es_host("localhost:9200")
            .debounce_ms(2000)
            .max_buffer_delay_ms(1000)
            .build();
        assert!(matches!(result, Err(SyncError::ConfigurationInvalid(_))));
    }
}
