//! CLI command implementations.

pub mod convention;
pub mod simulate;
