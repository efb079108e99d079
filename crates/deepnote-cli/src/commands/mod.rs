//! Command implementations.

pub mod integrations;
pub mod project;
