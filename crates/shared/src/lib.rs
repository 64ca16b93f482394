//! Shared types and configuration for Quill.
//!
//! This crate provides common building blocks used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Configuration management
//! - The payment collaborator interface and its HTTP client

pub mod config;
pub mod payment;
pub mod types;

pub use config::AppConfig;
pub use payment::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};
