//! Configuration module for index synchronization
//!
//! This module provides the `SyncConfig` struct and its type-safe builder
//! for configuring the search engine connection, the target index, and the
//! queue's timing with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{SyncConfigBuilder, WithHost};
pub use types::{DEFAULT_INDEX, SyncConfig};
