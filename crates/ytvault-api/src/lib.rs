//! Axum HTTP API server.
//!
//! This crate provides:
//! - Job CRUD over the worker's `JobManager`
//! - File delivery by registry id
//! - A WebSocket feed of job records, progress and notifications
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
