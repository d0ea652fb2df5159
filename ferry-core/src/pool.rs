use tracing::{info, warn};

use crate::config::{Config, Role};
use crate::error::SyncError;
use crate::remote::Connector;
use crate::session::Session;

/// The complete set of live sessions for the process, in configured endpoint
/// order. A pool is only ever entirely live or entirely torn down; a failed
/// build never leaks a partial pool to callers.
#[derive(Debug)]
pub struct SessionPool {
    sessions: Vec<Session>,
}

impl SessionPool {
    /// Connect every configured endpoint in order. On the first failure the
    /// already-opened sessions are closed and the whole build aborts.
    pub async fn build(cfg: &Config, connector: &dyn Connector) -> Result<Self, SyncError> {
        let mut sessions = Vec::with_capacity(cfg.endpoints.len());
        for endpoint in &cfg.endpoints {
            match connector.connect(endpoint).await {
                Ok(remote) => {
                    let session = Session::new(endpoint.clone(), remote);
                    info!("session established with {}", session.name());
                    sessions.push(session);
                }
                Err(source) => {
                    let partial = SessionPool { sessions };
                    partial.teardown().await;
                    return Err(SyncError::Connectivity {
                        endpoint: endpoint.display_name(),
                        source,
                    });
                }
            }
        }
        Ok(SessionPool { sessions })
    }

    /// Close every session in pool order. Idempotent: close errors (already
    /// dead or already closed connections) are logged, never propagated.
    pub async fn teardown(&self) {
        for session in &self.sessions {
            match session.remote().close().await {
                Ok(()) => info!("session with {} closed", session.name()),
                Err(e) => warn!("closing session with {} failed: {e:#}", session.name()),
            }
        }
    }

    /// True iff every session's connection reports alive. A single dead
    /// connection marks the whole pool unhealthy.
    pub async fn healthcheck(&self) -> bool {
        for session in &self.sessions {
            if !session.remote().is_alive().await {
                warn!("session with {} is dead", session.name());
                return false;
            }
        }
        true
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Partition the pool by declared role for relay mode. Undifferentiated
    /// sessions fall in neither subset.
    pub fn partition_roles(&self) -> (Vec<usize>, Vec<usize>) {
        let mut sources = Vec::new();
        let mut destinations = Vec::new();
        for (idx, session) in self.sessions.iter().enumerate() {
            match session.role() {
                Role::Source => sources.push(idx),
                Role::Destination => destinations.push(idx),
                Role::Any => {}
            }
        }
        (sources, destinations)
    }
}
