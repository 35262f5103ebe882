//! HTTP server for the mobile security service.
//!
//! Exposes `POST /api/init`, the handshake mobile clients send on every app
//! launch, plus health and readiness endpoints.

pub mod config;
pub mod handlers;
pub mod initclient;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use initclient::{InitError, InitService};
pub use server::{AppState, MssServer, ServerBuilder, build_app, create_repository};
