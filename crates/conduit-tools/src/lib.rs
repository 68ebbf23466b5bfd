//! Worker side of Conduit
//!
//! Holds the tool registry, the weather tools, the completion planner and
//! the stdio JSON-RPC server that a controller drives.

pub mod planner;
pub mod registry;
pub mod server;
pub mod settings;
pub mod tool;
pub mod weather;

pub use planner::{HELP_TEXT, KeywordPlanner, Planner};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use server::WorkerServer;
pub use settings::WorkerSettings;
pub use tool::{Tool, ToolError};
pub use weather::{OpenWeatherMapProvider, ProviderError, WeatherProvider, weather_tools};

use std::sync::Arc;

/// Get all default tools, backed by OpenWeatherMap
pub fn get_default_tools(settings: WorkerSettings) -> Result<Vec<Arc<dyn Tool>>, ProviderError> {
    let provider = OpenWeatherMapProvider::new(settings)?;
    Ok(weather_tools(Arc::new(provider)))
}

/// Registry populated with the default tools
pub fn default_registry(settings: WorkerSettings) -> Result<ToolRegistry, ProviderError> {
    Ok(ToolRegistryBuilder::new()
        .with_tools(get_default_tools(settings)?)
        .build())
}

/// Worker server with the default tools and the keyword planner
pub fn default_server(settings: WorkerSettings) -> Result<WorkerServer, ProviderError> {
    Ok(WorkerServer::new(
        default_registry(settings)?,
        Box::new(KeywordPlanner::new()),
    ))
}
