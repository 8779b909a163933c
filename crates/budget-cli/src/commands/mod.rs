//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (settings lookup, running the pipeline, formatting)
//! - `classify` - Classified transaction listing and summary
//! - `discover` - Rule suggestions for unknown merchants
//! - `rules` - Rule listing and testing
//! - `formats` - Format string checking

pub mod classify;
pub mod core;
pub mod discover;
pub mod formats;
pub mod rules;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use discover::*;
pub use formats::*;
pub use rules::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
