//! Shared model, error taxonomy, settings and locale helpers for the
//! project dashboard.

pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{DashboardError, Result};
