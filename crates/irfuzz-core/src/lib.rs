//! Core types and utilities shared by the irfuzz transformation crates.

pub mod config;
pub mod error;

pub use error::{Error, Result};
pub use config::*;
