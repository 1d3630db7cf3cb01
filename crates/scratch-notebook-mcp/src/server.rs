//! Server wiring and lifecycle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use scratch_notebook_core::{Config, EvictionPolicy, ScratchError, ScratchResult, DEFAULT_TENANT_ID};
use scratch_notebook_embeddings::SearchService;
use scratch_notebook_storage::{CatalogStore, StorageLimits};

use crate::auth::{run_startup_migration, TokenRegistry};
use crate::handlers::Handlers;
use crate::metrics::Metrics;
use crate::shutdown::ShutdownGate;
use crate::sweeper::spawn_sweeper;
use crate::transport::{build_router, run_stdio, serve_http};

/// Everything handlers and transports share.
pub struct AppState {
    pub config: Config,
    pub store: Arc<CatalogStore>,
    pub search: Arc<SearchService>,
    pub auth: Option<TokenRegistry>,
    pub gate: ShutdownGate,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Tenant used when the transport supplies no principal: the first
    /// configured principal under auth, else the implicit default.
    pub fn active_default_tenant(&self) -> String {
        self.auth
            .as_ref()
            .map(|registry| registry.first_principal().to_string())
            .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string())
    }
}

/// The assembled server.
pub struct ScratchServer {
    state: Arc<AppState>,
    handlers: Arc<Handlers>,
}

impl ScratchServer {
    /// Open storage, run the first-enable tenant migration, and build the
    /// shared state. Fails with `CONFIG_ERROR` on invalid setups.
    pub fn initialize(config: Config) -> ScratchResult<Self> {
        std::fs::create_dir_all(&config.storage_dir)
            .map_err(|_| ScratchError::config("Unable to create storage directory"))?;

        let store = Arc::new(CatalogStore::open(
            &config.storage_dir,
            StorageLimits::from_config(&config),
        )?);
        let search = Arc::new(SearchService::new(&config, Arc::clone(&store))?);
        let auth = TokenRegistry::from_config(&config);
        run_startup_migration(&store, auth.as_ref(), &config)?;
        let metrics = Arc::new(Metrics::new()?);

        let state = Arc::new(AppState {
            config,
            store,
            search,
            auth,
            gate: ShutdownGate::new(),
            metrics,
        });
        let handlers = Arc::new(Handlers::new(Arc::clone(&state)));
        Ok(Self { state, handlers })
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn handlers(&self) -> Arc<Handlers> {
        Arc::clone(&self.handlers)
    }

    /// Serve the enabled transports until ctrl-c or stdin EOF, then drain.
    pub async fn run(&self) -> anyhow::Result<()> {
        let config = &self.state.config;

        let sweeper: Option<JoinHandle<()>> = (config.eviction_policy == EvictionPolicy::Preempt)
            .then(|| {
                spawn_sweeper(
                    Arc::clone(&self.state.store),
                    Arc::clone(&self.state.metrics),
                    &self.state.gate,
                    config.preempt_age,
                    config.preempt_interval,
                )
            });

        let mut http_task: Option<JoinHandle<anyhow::Result<()>>> = None;
        if config.enable_http || config.enable_sse || config.enable_metrics {
            let router = build_router(Arc::clone(&self.handlers), Arc::clone(&self.state));
            let app = Arc::clone(&self.state);
            http_task = Some(tokio::spawn(serve_http(router, app)));
        } else {
            info!("http/sse transports disabled");
        }

        let stdio_only = config.enable_stdio && http_task.is_none();
        if config.enable_stdio && !stdio_only {
            let handlers = Arc::clone(&self.handlers);
            let gate = self.state.gate.clone();
            tokio::spawn(async move {
                if let Err(err) = run_stdio(handlers, gate).await {
                    error!(error = %err, "stdio transport failed");
                }
            });
        } else if !config.enable_stdio {
            info!("stdio transport disabled");
        }

        // run until interrupted; a closed stdio session also ends the
        // server when stdio is the only transport
        if stdio_only {
            let stdio = run_stdio(Arc::clone(&self.handlers), self.state.gate.clone());
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_err() {
                        error!("failed to listen for shutdown signal");
                    }
                    info!("shutdown signal received");
                }
                result = stdio => {
                    if let Err(err) = result {
                        error!(error = %err, "stdio transport failed");
                    }
                }
            }
        } else {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown signal received"),
                Err(_) => error!("failed to listen for shutdown signal"),
            }
        }

        self.drain().await;

        if let Some(task) = http_task {
            let _ = task.await;
        }
        if let Some(task) = sweeper {
            let _ = task.await;
        }
        Ok(())
    }

    /// Transition the gate through `Draining`; after the deadline the
    /// remaining operations are abandoned (their committed effects stand).
    pub async fn drain(&self) {
        let timeout = self.state.config.shutdown_timeout;
        let drained = self.state.gate.drain(timeout).await;
        if drained {
            info!("drained in-flight requests");
        } else {
            warn!(
                active_requests = self.state.gate.active_requests(),
                timeout_secs = timeout.as_secs(),
                "shutdown drain timed out; outstanding operations aborted"
            );
        }
    }
}

