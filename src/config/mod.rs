//! Configuration module for Junction.
//!
//! Handles the TOML catalog of databases and nodes, environment variables,
//! and verifier settings.

mod settings;

pub use settings::{expand_env_vars, Settings, SettingsError, VerifierSettings};
