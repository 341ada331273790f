//! # API Shared
//!
//! Shared utilities and definitions for the OPD APIs.
//!
//! Contains:
//! - Wire request/response types (`dto` module) with their conversions to and from core types
//! - Shared services like `HealthService`
//! - Caller identity parsing (`auth` module)
//!
//! Used by `api-rest` and the CLI for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{caller_from_header, CALLER_HEADER};
pub use dto::*;
pub use health::HealthService;
