//! Display formatting helpers.

pub mod format;

pub use format::{format_count, format_value, humanize_key, MISSING_VALUE};
