//! Axum router construction for the service facade.
//!
//! Assembles every collection route into a single [`Router`] with a CORS
//! whitelist and HTTP request tracing.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Cross-origin policy for browser clients.
#[derive(Debug, Clone)]
pub struct CorsSettings {
    /// Origins allowed to call the API, e.g. `http://localhost:3000`.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                String::from("http://localhost:3000"),
                String::from("http://127.0.0.1:8000"),
                String::from("http://localhost:8000"),
            ],
        }
    }
}

impl CorsSettings {
    fn layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(%origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

/// Build the complete Axum router for the service.
///
/// Each collection is served both with and without a trailing slash:
/// - `GET|POST /students/`, `GET|PUT|DELETE /students/{id}`
/// - `GET|POST /courses/`, `GET|PUT|DELETE /courses/{id}`
/// - `GET|POST /enrollments/`, `GET|PUT|DELETE /enrollments/{id}`
pub fn build_router(state: Arc<AppState>, cors: &CorsSettings) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        // Students
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/{id}",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        )
        // Courses
        .route(
            "/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/courses/",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/courses/{id}",
            get(handlers::get_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        // Enrollments
        .route(
            "/enrollments",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route(
            "/enrollments/",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route(
            "/enrollments/{id}",
            get(handlers::get_enrollment)
                .put(handlers::update_enrollment)
                .delete(handlers::delete_enrollment),
        )
        .layer(cors.layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
