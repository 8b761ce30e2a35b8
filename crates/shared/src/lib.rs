//! Shared types, errors, and configuration for Bóveda.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision and the reporting rounding rule
//! - Typed IDs for movements, transfers, cut-offs and reconciliation runs
//! - Vault keys, actor identities and client operation keys
//! - Application-wide error types
//! - Configuration management, including the vault catalog

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
