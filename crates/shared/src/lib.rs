//! Launchkit Shared Types and Utilities
//!
//! This crate contains types, errors, and database helpers shared by the
//! billing and API crates.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
