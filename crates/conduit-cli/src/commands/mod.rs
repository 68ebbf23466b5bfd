//! CLI commands

pub mod config;
pub mod direct;
pub mod query;
pub mod tools;
