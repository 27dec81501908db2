//! Core building blocks: error taxonomy, configuration and domain types.

pub mod config;
pub mod error;
pub mod types;
