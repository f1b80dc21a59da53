//! Formatting helpers

pub mod size;
