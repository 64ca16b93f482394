//! Middleware components.

pub mod auth;

pub use auth::ApiLedger;
