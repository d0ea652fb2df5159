//! Core library for ferry – an SFTP relay/sync daemon.
//!
//! Watches local directories and remote endpoints on a fixed interval and
//! moves newly-arrived files between them in one of three topologies
//! (local→remote fan-out, remote→local fan-in, remote→remote relay). The
//! supervisor rebuilds the whole session pool and relaunches the engine
//! whenever a connection dies. Protocol code lives behind the
//! [`Connector`]/[`RemoteSession`] seam in `ferry-remote-sftp`.

mod config;
mod engine;
mod error;
mod pool;
mod remote;
mod session;
mod supervisor;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
pub(crate) mod test_util;

pub use config::{Config, EndpointConfig, EnginePlan, ModeToggle, OpMode, Role};
pub use engine::{spawn_engine, EngineCommand, EngineHandle, EngineState};
pub use error::SyncError;
pub use pool::SessionPool;
pub use remote::{Connector, RemoteSession};
pub use session::Session;
pub use supervisor::{Shutdown, Supervisor};
