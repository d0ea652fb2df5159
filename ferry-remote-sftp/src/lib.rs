//! SFTP backend for ferry, on top of `russh` + `russh-sftp`.
//!
//! [`SftpConnector`] opens the connection, authenticates with a password,
//! starts the sftp subsystem and resolves the endpoint's working directory;
//! the resulting [`SftpEndpoint`] serves the core's `RemoteSession` surface.

mod ssh_client;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ferry_core::{Connector, EndpointConfig, RemoteSession};
use russh::client::AuthResult;
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use ssh_client::Client;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SftpConnector;

#[async_trait]
impl Connector for SftpConnector {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Box<dyn RemoteSession>> {
        info!("starting new sftp session with {}", endpoint.display_name());
        let config = russh::client::Config::default();
        let handler = Client {
            allowed_fingerprints: endpoint.fingerprints.clone(),
        };
        let mut handle = russh::client::connect(
            Arc::new(config),
            (endpoint.host.as_str(), endpoint.port),
            handler,
        )
        .await?;
        let res = handle
            .authenticate_password(
                &endpoint.username,
                endpoint.password.as_deref().unwrap_or(""),
            )
            .await?;
        if let AuthResult::Failure {
            remaining_methods,
            partial_success,
        } = res
        {
            return Err(anyhow!(
                "authentication as {} failed, remaining_methods: {:?}, partial_success: {}",
                endpoint.username,
                remaining_methods,
                partial_success
            ));
        }
        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        // Resolving the configured path doubles as the working-directory
        // check: a missing or unreadable path aborts the connect.
        let base = sftp.canonicalize(&endpoint.path).await?;
        debug!("working directory for {}: {base}", endpoint.display_name());
        Ok(Box::new(SftpEndpoint { handle, sftp, base }))
    }
}

pub struct SftpEndpoint {
    handle: russh::client::Handle<Client>,
    sftp: SftpSession,
    base: String,
}

/// Join a file name onto the resolved working directory.
fn join_remote(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

impl SftpEndpoint {
    fn remote_path(&self, name: &str) -> String {
        join_remote(&self.base, name)
    }
}

#[async_trait]
impl RemoteSession for SftpEndpoint {
    async fn list(&self) -> Result<Vec<String>> {
        let entries = self.sftp.read_dir(&self.base).await?;
        let mut names = Vec::new();
        for entry in entries {
            let name = entry.file_name();
            if name == "." || name == ".." || entry.metadata().is_dir() {
                continue;
            }
            names.push(name);
        }
        Ok(names)
    }

    async fn download(&self, name: &str, local: &Path) -> Result<()> {
        let mut remote_file = self.sftp.open(self.remote_path(name)).await?;
        let mut writer = tokio::fs::File::create(local).await?;
        tokio::io::copy(&mut remote_file, &mut writer).await?;
        Ok(())
    }

    async fn upload(&self, local: &Path, name: &str) -> Result<()> {
        let mut reader = tokio::fs::File::open(local).await?;
        let mut remote_file = self.sftp.create(self.remote_path(name)).await?;
        tokio::io::copy(&mut reader, &mut remote_file).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.sftp.remove_file(self.remote_path(name)).await?;
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        !self.handle.is_closed()
    }

    async fn close(&self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_paths_join_against_the_base() {
        assert_eq!(join_remote("/outbox", "a.txt"), "/outbox/a.txt");
        assert_eq!(join_remote("/outbox/", "a.txt"), "/outbox/a.txt");
        assert_eq!(join_remote("/", "a.txt"), "/a.txt");
    }
}
