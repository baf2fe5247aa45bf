//! Traffic API service library
//!
//! Exposes the router and configuration so integration tests can drive the
//! service in-process.

pub mod api;
pub mod config;

pub use api::{create_router, serve, AppState};
pub use config::ServerConfig;
