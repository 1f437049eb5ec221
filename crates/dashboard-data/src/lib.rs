//! Data layer for the project dashboard.
//!
//! Loads project/task rows from a CSV file or a Notion database, normalizes
//! them, applies user filters and computes the grouped counts and headline
//! figures a dashboard renders.

pub mod aggregator;
pub mod aliases;
pub mod filter;
pub mod normalizer;
pub mod notion;
pub mod reader;
pub mod report;
pub mod source;

pub use dashboard_core as core;
