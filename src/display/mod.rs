//! Rich terminal display utilities for CLI output.
//!
//! Provides styled tables, spinners and themed messages.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_spinner, with_spinner};
pub use tables::{TableBuilder, create_cluster_table, create_summary_table};
pub use theme::{Status, THEME, Theme};
