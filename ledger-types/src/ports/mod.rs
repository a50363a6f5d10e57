//! Port traits (interfaces for adapters).
//!
//! The application layer depends on these traits, not on concrete
//! storage implementations.

mod api_keys;
mod repository;

pub use api_keys::ApiKeyRepository;
pub use repository::LedgerRepository;
