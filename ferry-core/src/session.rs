use crate::config::{EndpointConfig, Role};
use crate::remote::RemoteSession;

/// One live, authenticated connection to a remote endpoint plus its declared
/// role. Owned exclusively by the pool; engines only ever see `&Session`.
pub struct Session {
    endpoint: EndpointConfig,
    name: String,
    remote: Box<dyn RemoteSession>,
}

impl Session {
    pub fn new(endpoint: EndpointConfig, remote: Box<dyn RemoteSession>) -> Self {
        let name = endpoint.display_name();
        Self {
            endpoint,
            name,
            remote,
        }
    }

    /// Display name for logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.endpoint.role
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn remote(&self) -> &dyn RemoteSession {
        self.remote.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("role", &self.endpoint.role)
            .finish()
    }
}
