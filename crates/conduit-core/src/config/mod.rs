//! Configuration for the controller
//!
//! Loaded once at startup (file, then `CONDUIT_*` environment overrides)
//! and handed to the components that need it.

pub mod defaults;
pub mod env_loader;
pub mod file_loader;
pub mod model;

pub use env_loader::{apply_env_overrides, apply_process_env};
pub use file_loader::{load_from_file, render_config};
pub use model::{
    ConduitConfig, DiagnosticsConfig, LoggingConfig, RpcConfig, SessionConfig, WorkerConfig,
};

use crate::error::ConduitResult;
use std::path::Path;

/// Load the file (when given) and apply process environment overrides
pub fn load_config(path: Option<&Path>) -> ConduitResult<ConduitConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => ConduitConfig::default(),
    };
    apply_process_env(&mut config)?;
    Ok(config)
}
