//! Builder methods for `SyncConfigBuilder`
//!
//! Optional settings, available in every builder state.

use super::builder::SyncConfigBuilder;

impl<State> SyncConfigBuilder<State> {
    #[must_use]
    pub fn es_index(mut self, index: impl Into<String>) -> Self {
        self.config.es_index = index.into();
        self
    }

    /// Log bulk results at info level
    #[must_use]
    pub fn log_results(mut self, enabled: bool) -> Self {
        self.config.log_results = enabled;
        self
    }

    #[must_use]
    pub fn debounce_ms(mut self, millis: u64) -> Self {
        self.config.debounce_ms = millis;
        self
    }

    #[must_use]
    pub fn max_buffer_delay_ms(mut self, millis: u64) -> Self {
        self.config.max_buffer_delay_ms = millis;
        self
    }

    #[must_use]
    pub fn reset_max_attempts(mut self, attempts: u32) -> Self {
        self.config.reset_max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn reset_backoff_ms(mut self, millis: u64) -> Self {
        self.config.reset_backoff_ms = millis;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Only synchronize these collections
    #[must_use]
    pub fn whitelist<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.whitelist = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    /// Never synchronize these collections
    #[must_use]
    pub fn blacklist<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.blacklist = Some(collections.into_iter().map(Into::into).collect());
        self
    }
}
