//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod extract;
mod handlers;
mod server;

pub use handlers::INTERNAL_ERROR_MESSAGE;
pub use server::HttpServer;
