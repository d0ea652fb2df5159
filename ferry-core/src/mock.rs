//! In-memory stand-ins for the remote capability, used across the crate's
//! tests. One backing store per host survives reconnects, so a rebuilt pool
//! sees the same remote files a torn-down one did.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::EndpointConfig;
use crate::remote::{Connector, RemoteSession};

#[derive(Default)]
struct StoreInner {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<HashMap<String, usize>>,
    fail_uploads: AtomicBool,
}

/// Inspection handle for one host's backing store.
#[derive(Clone)]
pub struct StoreHandle(Arc<StoreInner>);

impl StoreHandle {
    pub fn put(&self, name: &str, content: &[u8]) {
        self.0
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_vec());
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.0.files.lock().unwrap().get(name).cloned()
    }

    /// How many uploads of `name` this host accepted.
    pub fn upload_count(&self, name: &str) -> usize {
        self.0.uploads.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

struct SessionState {
    alive: AtomicBool,
    closed: AtomicBool,
}

#[derive(Default)]
pub struct MockConnector {
    stores: Mutex<HashMap<String, Arc<StoreInner>>>,
    sessions: Mutex<HashMap<String, Vec<Arc<SessionState>>>>,
    refused: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub fn store(&self, host: &str) -> StoreHandle {
        StoreHandle(self.store_inner(host))
    }

    fn store_inner(&self, host: &str) -> Arc<StoreInner> {
        self.stores
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .clone()
    }

    /// Make future connect attempts to `host` fail.
    pub fn refuse_host(&self, host: &str) {
        self.refused.lock().unwrap().insert(host.to_string());
    }

    /// Flip every existing session of `host` to dead. New sessions come up
    /// alive again.
    pub fn kill_host(&self, host: &str) {
        if let Some(states) = self.sessions.lock().unwrap().get(host) {
            for state in states {
                state.alive.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Make every upload to `host` fail while leaving the session usable.
    pub fn fail_uploads(&self, host: &str) {
        self.store_inner(host).fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Sessions connected and not yet closed, across all hosts.
    pub fn open_session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .flatten()
            .filter(|s| !s.closed.load(Ordering::SeqCst))
            .count()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Box<dyn RemoteSession>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refused.lock().unwrap().contains(&endpoint.host) {
            return Err(anyhow!("connection refused"));
        }
        let store = self.store_inner(&endpoint.host);
        let state = Arc::new(SessionState {
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        });
        self.sessions
            .lock()
            .unwrap()
            .entry(endpoint.host.clone())
            .or_default()
            .push(state.clone());
        Ok(Box::new(MockRemote {
            host: endpoint.host.clone(),
            store,
            state,
        }))
    }
}

pub struct MockRemote {
    host: String,
    store: Arc<StoreInner>,
    state: Arc<SessionState>,
}

impl MockRemote {
    fn check_open(&self) -> Result<()> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("session with {} is closed", self.host));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for MockRemote {
    async fn list(&self) -> Result<Vec<String>> {
        self.check_open()?;
        Ok(self.store.files.lock().unwrap().keys().cloned().collect())
    }

    async fn download(&self, name: &str, local: &Path) -> Result<()> {
        self.check_open()?;
        let content = self
            .store
            .files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {name}"))?;
        tokio::fs::write(local, content).await?;
        Ok(())
    }

    async fn upload(&self, local: &Path, name: &str) -> Result<()> {
        self.check_open()?;
        if self.store.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow!("injected upload failure on {}", self.host));
        }
        let content = tokio::fs::read(local).await?;
        self.store
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), content);
        *self
            .store
            .uploads
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.check_open()?;
        self.store
            .files
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| anyhow!("no such file: {name}"))?;
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        !self.state.closed.load(Ordering::SeqCst) && self.state.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("session with {} already closed", self.host));
        }
        Ok(())
    }
}
