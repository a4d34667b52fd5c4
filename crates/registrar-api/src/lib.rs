//! Service facade for the Registrar service.
//!
//! This crate provides an Axum HTTP server that exposes CRUD endpoints for
//! students, courses and enrollments. Every mutation is committed to the
//! record store first; only then is the sync engine asked to project or
//! retract the mirror document.
//!
//! # Failure Asymmetry
//!
//! Record store errors (not found, duplicate email, integrity violations)
//! abort the request before any mirror call. Mirror errors are logged by
//! the [`hooks`] and never change the response: the relational write has
//! already committed, and the bulk reconciler repairs the mirror later.

pub mod error;
pub mod handlers;
pub mod hooks;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::{CorsSettings, build_router};
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
