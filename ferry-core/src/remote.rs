use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::config::EndpointConfig;

/// Capability surface the transfer engines need from one remote endpoint.
///
/// The concrete SFTP implementation lives in `ferry-remote-sftp`; tests
/// substitute an in-memory fake. All paths are relative to the working
/// directory resolved at connect time.
#[async_trait]
pub trait RemoteSession: Send + Sync + 'static {
    /// Names of regular files directly under the working directory.
    async fn list(&self) -> Result<Vec<String>>;

    /// Fetch `name` into `local`.
    async fn download(&self, name: &str, local: &Path) -> Result<()>;

    /// Store `local` as `name`.
    async fn upload(&self, local: &Path, name: &str) -> Result<()>;

    /// Delete `name` from the working directory.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Whether the underlying connection still reports alive.
    async fn is_alive(&self) -> bool;

    /// Close the transfer client and the connection. Closing an already
    /// dead session is allowed to fail; callers log and move on.
    async fn close(&self) -> Result<()>;
}

/// Factory for [`RemoteSession`]s. The pool manager goes through this seam so
/// the whole pipeline can be rebuilt after connectivity loss, and so tests
/// never need a live server.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection, authenticate and resolve the endpoint's working
    /// directory. Either returns a fully usable session or an error; there
    /// is no partially connected state.
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Box<dyn RemoteSession>>;
}
