//! Data layer for the Registrar service (`PostgreSQL` + `Dragonfly`).
//!
//! `PostgreSQL` is the record store and the only source of truth.
//! `Dragonfly` is the mirror store: a denormalized, independently readable
//! copy of every row, kept up to date by the sync engine after each commit
//! and rebuilt on demand by the bulk reconciler.
//!
//! # Architecture
//!
//! ```text
//! Mutation request
//!     |
//!     +-- Commit row ------------> PostgreSQL (PostgresPool)
//!     |                              |-- StudentStore
//!     |                              |-- CourseStore
//!     |                              +-- EnrollmentStore
//!     |
//!     +-- project / retract -----> Mirror (dyn MirrorStore)
//!         (best effort)              |-- DragonflyMirror
//!                                    +-- MemoryMirror
//!
//! Reconciler --- page_after ---> PostgreSQL --- project ---> Mirror
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`student_store`], [`course_store`], [`enrollment_store`] -- Per-table operations
//! - [`mirror`] -- Mirror document type, store trait, in-memory store
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) mirror store
//! - [`sync`] -- The sync engine (projection and retraction)
//! - [`reconcile`] -- The bulk reconciler
//! - [`error`] -- Shared error types

pub mod course_store;
pub mod dragonfly;
pub mod enrollment_store;
pub mod error;
pub mod mirror;
pub mod postgres;
pub mod reconcile;
pub mod student_store;
pub mod sync;

// Re-export primary types for convenience.
pub use course_store::{CourseRow, CourseStore};
pub use dragonfly::{DEFAULT_KEY_PREFIX, DragonflyMirror};
pub use enrollment_store::{EnrollmentRow, EnrollmentStore};
pub use error::{DbError, MirrorError};
pub use mirror::{MemoryMirror, MirrorDocument, MirrorStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use reconcile::{
    DEFAULT_PAGE_SIZE, KindReport, ReconcileError, ReconcileFailure, ReconcileReport, Reconciler,
    RecordPages,
};
pub use student_store::{StudentRow, StudentStore};
pub use sync::{Projection, Retraction, SyncEngine, SyncError, log_projection, log_retraction};
