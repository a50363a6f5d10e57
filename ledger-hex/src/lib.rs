//! # Ledger Hex
//!
//! Application service layer and HTTP adapter for the payment ledger core.
//!
//! ## Architecture
//!
//! - `service/` - `PaymentService`, the core's public contract (payment state
//!   machine orchestration, ownership checks, read scoping)
//! - `inbound/` - HTTP adapter (Axum server, API key authentication)
//! - `bootstrap/` - Issues the first privileged key on an empty key store
//! - `openapi/` - OpenAPI document for the HTTP surface
//!
//! The service is generic over `R: LedgerRepository`, allowing
//! different repository implementations to be injected.

pub mod bootstrap;
pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::PaymentService;
