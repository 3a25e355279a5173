//! `fieldcheck-compare`: keyed two-table field comparison engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns per-column stats
//! and the shaped report sheets. No CLI or IO dependencies.

pub mod aggregate;
pub mod align;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pivot;
pub mod report;

pub use config::CompareConfig;
pub use engine::run;
pub use error::CompareError;
pub use model::{CellValue, ComparisonResult, Side, Table};
