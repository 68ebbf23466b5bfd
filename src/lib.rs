//! # Conduit
//!
//! A controller that supervises a tool-serving worker process and talks
//! line-delimited JSON-RPC to it over the worker's stdin and stdout.
//!
//! - [`controller`]: process supervision, the request channel and sessions
//! - [`worker`]: the worker side (tool registry, weather tools, stdio server)
//!
//! ```rust,ignore
//! use conduit::SessionManager;
//!
//! let config = conduit::controller::config::load_config(None)?;
//! let mut manager = SessionManager::from_config(&config);
//! let outcome = manager.query("weather in Taipei").await?;
//! println!("{}", outcome.content);
//! ```

pub use conduit_core as controller;
pub use conduit_tools as worker;

pub use conduit_core::{ConduitConfig, ConduitError, ConduitResult, SessionManager};
