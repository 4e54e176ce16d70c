//! Signal database and DBC parser
//!
//! This module contains the DBC parser and the unified signal database
//! the frame decoder and signal catalog are built from.

pub mod dbc;
pub mod database;

// Re-export key types for convenience
pub use database::{DatabaseStats, SignalDatabase};
