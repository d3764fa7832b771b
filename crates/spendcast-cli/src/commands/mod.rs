//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db)
//! - `transactions` - Add, delete, list
//! - `import` - CSV import
//! - `status` - Database and forecast readiness
//! - `forecast` - Monthly buckets and next-month forecasts
//! - `training` - Training table export
//! - `categorize` - Category suggestions from the classifier

pub mod categorize;
pub mod core;
pub mod forecast;
pub mod import;
pub mod status;
pub mod training;
pub mod transactions;

// Re-export command functions for main.rs
pub use categorize::*;
pub use core::*;
pub use forecast::*;
pub use import::*;
pub use status::*;
pub use training::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
