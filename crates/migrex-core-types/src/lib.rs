//! Core types shared across migrex facilities
//!
//! This crate provides foundational types used by both the error and
//! logging facilities:
//!
//! - **Correlation types**: RunId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
