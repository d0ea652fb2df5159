use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{spawn_engine, EngineHandle};
use crate::error::SyncError;
use crate::pool::SessionPool;
use crate::remote::Connector;

/// How a supervisor run ended without a fault. Both cases map to exit 0 at
/// the process boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Manual interrupt; pool and engine were torn down gracefully.
    Interrupted,
    /// No enabled mode or no endpoints configured: an operator mistake, not
    /// a fault. No engine was ever started.
    NoWork,
}

/// Builds the pool, launches the configured engine, and rebuilds both from
/// scratch whenever a session dies.
pub struct Supervisor {
    cfg: Arc<Config>,
    connector: Arc<dyn Connector>,
}

impl Supervisor {
    pub fn new(cfg: Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            connector,
        }
    }

    /// Run until the token is cancelled or an unrecoverable error occurs.
    ///
    /// Recovery cycle: on the first dead session found by the liveness probe,
    /// stop the engine and wait for its loop to exit, tear the whole pool
    /// down, reconnect every endpoint, and relaunch the same engine mode.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<Shutdown, SyncError> {
        let Some(plan) = self.cfg.first_enabled_mode() else {
            warn!("no operation mode enabled, nothing to do");
            return Ok(Shutdown::NoWork);
        };
        if self.cfg.endpoints.is_empty() {
            warn!("no remote endpoints configured, nothing to do");
            return Ok(Shutdown::NoWork);
        }

        let mut pool = Arc::new(SessionPool::build(&self.cfg, self.connector.as_ref()).await?);
        let mut engine = spawn_engine(self.cfg.clone(), plan, pool.clone());
        info!("supervisor running in {} mode with {} session(s)", plan.mode, pool.len());

        let health_interval = self.cfg.health_interval();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(health_interval) => {
                    if pool.healthcheck().await {
                        continue;
                    }
                    warn!("dead session detected, rebuilding the pool");
                    stop_pipeline(engine, &pool).await?;
                    pool = Arc::new(SessionPool::build(&self.cfg, self.connector.as_ref()).await?);
                    engine = spawn_engine(self.cfg.clone(), plan, pool.clone());
                    info!("pool rebuilt, {} engine relaunched", plan.mode);
                }
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, closing all sessions");
                    stop_pipeline(engine, &pool).await?;
                    return Ok(Shutdown::Interrupted);
                }
            }
        }
    }
}

/// Stop the engine, wait for its loop to exit, then close the sessions.
/// The join must come first: tearing the pool down while the loop is still
/// mid-iteration would hand it closed handles.
async fn stop_pipeline(engine: EngineHandle, pool: &SessionPool) -> Result<(), SyncError> {
    let joined = engine.shutdown().await;
    pool.teardown().await;
    joined.map_err(SyncError::from)
}
