//!
//! WPS Server - host process for the WPS engine
//!
//! Loads the configuration, registers the configured processes, runs the
//! job retention sweeper and shuts down on Ctrl-C. Transport bindings
//! attach to the [`ExecutionCoordinator`](wps_core::ExecutionCoordinator)
//! exposed by [`WpsServer::coordinator`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration module
pub mod config;

/// Error module
pub mod error;

/// Server module
pub mod server;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{shutdown_signal, WpsServer};

use wps_monitoring::LogExt;
use wps_stdlib::factory::{standard_algorithms, standard_formats};

/// Build the server from the standard processes and run it until Ctrl-C
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let server = WpsServer::build(config, standard_algorithms(), standard_formats())
        .log_err("Could not assemble the WPS server")?;
    server
        .run_until(shutdown_signal())
        .await
        .log_err("WPS server stopped with an error")
}
