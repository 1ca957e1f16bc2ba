//! Subcommand implementations.

pub mod doctor;
pub mod serve;
pub mod version;
