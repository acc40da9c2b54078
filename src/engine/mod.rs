//! Execution engine for dashctl
//!
//! The `declarative` crate plans and applies; this module adds the terminal
//! side:
//! 1. Displaying - Show the planned actions grouped by resource type
//! 2. Confirming - Ask before touching the workspace (unless --yes)
//! 3. Reporting - Per-resource progress and a final summary

pub mod differ;
pub mod executor;

pub use executor::{ApplyOptions, apply};
