//! Service assembly and the serve loop

use crate::config::{ConfigError, ServerConfig};
use crate::relay::{LogNotifier, RelayCredentials, RelayNotifier};
use crate::routes::routes;
use greetcard_core::claim::Notifier;
use greetcard_core::error::NotifyError;
use greetcard_core::SubmissionGuard;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

/// Startup failures
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("mail relay: {0}")]
    Notifier(#[from] NotifyError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

/// Build the guard described by `config`
///
/// # Errors
/// - `ServeError::Config` if no relay is configured and dry run is off
/// - `ServeError::Notifier` if the relay client cannot be built
pub fn build_guard(config: &ServerConfig) -> Result<SubmissionGuard, ServeError> {
    config.validate()?;

    let notifier: Arc<dyn Notifier> = if config.relay.dry_run {
        tracing::info!("dry run: claim mails will be logged, not sent");
        Arc::new(LogNotifier)
    } else {
        let relay = RelayNotifier::new(&config.relay, RelayCredentials::from_env())?;
        tracing::info!(relay = relay.url(), "sending claim mails through relay");
        Arc::new(relay)
    };

    Ok(
        SubmissionGuard::new(config.registry.build(), notifier, config.relay.from.clone())
            .with_unknown_policy(config.unknown_caller),
    )
}

/// Serve until `shutdown` resolves
///
/// `on_bound` receives the bound address (useful with port 0).
///
/// # Errors
/// - any error from [`build_guard`]
/// - `ServeError::Bind` if the listen address is unavailable
pub async fn serve(
    config: &ServerConfig,
    on_bound: impl FnOnce(SocketAddr),
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let guard = build_guard(config)?;
    let (addr, server) = warp::serve(routes(guard))
        .try_bind_with_graceful_shutdown(config.listen_addr, shutdown)
        .map_err(|source| ServeError::Bind {
            addr: config.listen_addr,
            source,
        })?;

    tracing::info!(%addr, "claim service listening");
    on_bound(addr);
    server.await;
    tracing::info!("claim service stopped");
    Ok(())
}
