//! Start/stop state machine for the relay's listening socket.
//!
//! ```text
//! Unloaded --load--> Loading --ready--> Listening --unload--> Unloading --> Unloaded
//! ```
//!
//! `ready` leaves the relay in `Loading` when the owner identity cannot be
//! resolved or the listen address cannot be bound. The host keeps running
//! and the relay stays offline until it is unloaded and loaded again.

use crate::app::bridge::SecretProvisioner;
use crate::ports::{CommandRunner, ConfigStore, IdentityLookup};
use crate::telemetry::RelayMetrics;
use crate::{router, AppState, Settings};
use anyhow::{bail, Context};
use axum::Router;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Loading,
    Listening,
    Unloading,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Unloaded => "unloaded",
            LifecycleState::Loading => "loading",
            LifecycleState::Listening => "listening",
            LifecycleState::Unloading => "unloading",
        };
        f.write_str(label)
    }
}

/// Collaborators the relay is built from.
#[derive(Clone)]
pub struct RelayDependencies {
    pub config_store: Arc<dyn ConfigStore>,
    pub runner: Arc<dyn CommandRunner>,
    pub identity: Arc<dyn IdentityLookup>,
    pub metrics: Option<Arc<RelayMetrics>>,
}

struct ServerGuard {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerGuard {
    async fn shutdown(self) {
        let ServerGuard {
            shutdown_tx,
            mut task,
        } = self;

        let _ = shutdown_tx.send(());

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => warn!(%err, "relay server exited with an error"),
            Ok(Err(join_err)) => warn!(%join_err, "relay server task join error"),
            Err(_) => {
                warn!("relay server did not drain in time; aborting open connections");
                task.abort();
            }
        }
    }
}

/// Owns the relay's routes and listening socket.
pub struct RelayServer {
    settings: Settings,
    deps: RelayDependencies,
    state: LifecycleState,
    app: Option<AppState>,
    routes: Option<Router>,
    server: Option<ServerGuard>,
    local_addr: Option<SocketAddr>,
}

impl RelayServer {
    pub fn new(settings: Settings, deps: RelayDependencies) -> Self {
        Self {
            settings,
            deps,
            state: LifecycleState::Unloaded,
            app: None,
            routes: None,
            server: None,
            local_addr: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Address actually bound, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Provisions the request key and registers routes.
    pub async fn load(&mut self) -> anyhow::Result<()> {
        if self.state != LifecycleState::Unloaded {
            bail!("relay cannot load while {}", self.state);
        }

        SecretProvisioner::new(
            self.deps.config_store.clone(),
            self.settings.config_name.clone(),
            self.deps.metrics.clone(),
        )
        .provision()
        .await
        .context("provisioning request key")?;

        let app = AppState::new(&self.settings, &self.deps);
        self.routes = Some(router(app.clone()));
        self.app = Some(app);
        self.state = LifecycleState::Loading;
        debug!(config = %self.settings.config_name, "comment relay loaded");
        Ok(())
    }

    /// Resolves the owner identity and starts listening.
    pub async fn ready(&mut self) -> LifecycleState {
        if self.state != LifecycleState::Loading {
            warn!(state = %self.state, "ready called outside of loading; ignoring");
            return self.state;
        }
        let (Some(app), Some(routes)) = (self.app.as_ref(), self.routes.clone()) else {
            error!("relay routes missing in loading state");
            return self.state;
        };

        match self.deps.identity.owner_identity().await {
            Ok(owner) => app.bind_requester(owner),
            Err(err) => {
                error!(error = %format!("{err:#}"), "failed to resolve owner identity; relay stays offline");
                return self.state;
            }
        }

        let listener = match TcpListener::bind(self.settings.listen).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(listen = %self.settings.listen, %err, "failed to bind relay listener; relay stays offline until reloaded");
                return self.state;
            }
        };
        self.local_addr = listener.local_addr().ok();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(
                listener,
                routes.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        });

        self.server = Some(ServerGuard { shutdown_tx, task });
        self.state = LifecycleState::Listening;
        info!(
            "listening" = %self.local_addr.unwrap_or(self.settings.listen),
            "output_log" = %self.settings.output_log.display(),
            "msg" = "comment relay started"
        );
        self.state
    }

    /// Closes the socket if one is open. Safe in every state.
    pub async fn unload(&mut self) {
        if self.state == LifecycleState::Unloaded {
            return;
        }
        self.state = LifecycleState::Unloading;

        if let Some(server) = self.server.take() {
            server.shutdown().await;
        }
        self.routes = None;
        self.app = None;
        self.local_addr = None;
        self.state = LifecycleState::Unloaded;
        info!("msg" = "comment relay unloaded");
    }
}
