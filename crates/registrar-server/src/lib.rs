//! Process wiring for the Registrar binaries.
//!
//! Shared by `registrar-server` (the HTTP service) and `registrar-reconcile`
//! (the one-shot bulk reconciler): configuration loading, logging setup,
//! and opening the two store handles.

pub mod config;
pub mod error;
pub mod logging;
pub mod startup;

pub use config::{ConfigError, RegistrarConfig};
pub use error::StartupError;
