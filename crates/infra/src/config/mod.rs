//! Configuration loading
//!
//! Resolves the [`ClientConfig`](photox_domain::ClientConfig) from
//! environment variables or a config file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, load_from_lookup, probe_config_paths};
