//! Greetcard Server - HTTP claim service
//!
//! Wraps the [`greetcard_core`] submission guard in a `warp` service:
//! - [`config`]: layered configuration (defaults, TOML, environment)
//! - [`routes`]: `POST /claim`, its legacy alias, `GET /health`
//! - [`relay`]: mail delivery over an HTTP relay, or a dry-run logger
//! - [`client`]: client for the claim endpoint driving the advisory form
//! - [`simulate`]: virtual-clock card runs for the CLI

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod config;
pub mod relay;
pub mod routes;
pub mod server;
pub mod simulate;
pub mod telemetry;

pub use client::{ClaimClient, ClaimClientError};
pub use config::{ConfigError, LogFormat, RegistryConfig, RelaySettings, ServerConfig};
pub use relay::{LogNotifier, RelayCredentials, RelayNotifier};
pub use server::{build_guard, serve, ServeError};
pub use simulate::{Simulation, SimulationStep};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
