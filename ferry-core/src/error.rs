use thiserror::Error;

/// Errors that escape the core to the process boundary.
///
/// Per-file transfer failures and dead-session detections are handled inside
/// the engine and supervisor and only surface through the log stream; a
/// nothing-to-do configuration is a clean [`Shutdown::NoWork`] value, not an
/// error, since it must exit zero.
///
/// [`Shutdown::NoWork`]: crate::Shutdown::NoWork
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connect, authentication or working-directory failure while building
    /// the session pool. Fatal: a partial pool is never kept.
    #[error("failed to establish session with {endpoint}: {source:#}")]
    Connectivity {
        endpoint: String,
        source: anyhow::Error,
    },

    /// The transfer engine task died instead of exiting its loop.
    #[error("transfer engine task failed: {0}")]
    Engine(#[from] tokio::task::JoinError),
}
