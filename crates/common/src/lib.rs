//! Shared types and utilities used across all courier crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::{ToolContent, ToolResult},
};
