//! Runtime layer for the project dashboard.
//!
//! Holds the loaded table in a shared cache and refreshes it in the
//! background on a fixed interval.

pub mod cache;
pub mod scheduler;

pub use dashboard_core as core;
pub use dashboard_data as data;
