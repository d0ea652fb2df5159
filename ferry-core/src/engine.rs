use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::{Config, EnginePlan, OpMode};
use crate::pool::SessionPool;
use crate::session::Session;

/// Public handle to a running transfer engine.
pub struct EngineHandle {
    plan: EnginePlan,
    ctrl_tx: mpsc::Sender<EngineCommand>,
    state_rx: watch::Receiver<EngineState>,
    join: JoinHandle<()>,
}

impl EngineHandle {
    pub fn mode(&self) -> OpMode {
        self.plan.mode
    }

    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Request a cooperative stop. The loop will not start a new iteration;
    /// an in-flight pass runs to completion.
    pub fn stop(&self) {
        let _ = self.ctrl_tx.try_send(EngineCommand::Stop);
    }

    /// Stop the engine and wait until its loop has actually exited. The pool
    /// must not be torn down before this returns, or the loop could still be
    /// operating on closed sessions.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        let _ = self.ctrl_tx.send(EngineCommand::Stop).await;
        self.join.await
    }
}

#[derive(Debug, Clone)]
pub enum EngineCommand {
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

/// Launch the configured transfer topology as an independent cancellable task
/// over a read-only snapshot of the pool.
pub fn spawn_engine(cfg: Arc<Config>, plan: EnginePlan, pool: Arc<SessionPool>) -> EngineHandle {
    let (ctrl_tx, ctrl_rx) = mpsc::channel(4);
    let (state_tx, state_rx) = watch::channel(EngineState::Idle);
    let engine = Engine::new(cfg, plan, pool);
    let join = tokio::spawn(engine.run(ctrl_rx, state_tx));
    EngineHandle {
        plan,
        ctrl_tx,
        state_rx,
        join,
    }
}

/// Where a pass discovers files.
enum FileSource<'a> {
    Local(&'a Path),
    Remote(&'a Session),
}

impl FileSource<'_> {
    fn describe(&self) -> String {
        match self {
            FileSource::Local(dir) => dir.display().to_string(),
            FileSource::Remote(session) => session.name().to_string(),
        }
    }
}

/// One directed route walked per pass: discover files at `source`, fetch them
/// into the `staging` directories, deliver from local storage to every
/// session in `deliver_to`, then apply the cleanup flags. The three
/// topologies only differ in how their edge lists are built.
struct Edge<'a> {
    source: FileSource<'a>,
    /// Local directories remote files are fetched into; empty when the
    /// source is already local.
    staging: Vec<PathBuf>,
    /// Sessions the file is uploaded to from local storage.
    deliver_to: Vec<&'a Session>,
    keep_staging: bool,
    remove_source: bool,
}

pub(crate) struct Engine {
    cfg: Arc<Config>,
    plan: EnginePlan,
    pool: Arc<SessionPool>,
    /// Relay partition, determined once per pool build.
    relay_sources: Vec<usize>,
    relay_destinations: Vec<usize>,
}

impl Engine {
    pub(crate) fn new(cfg: Arc<Config>, plan: EnginePlan, pool: Arc<SessionPool>) -> Self {
        let (relay_sources, relay_destinations) = match plan.mode {
            OpMode::SftpsToSftps => {
                let (sources, destinations) = pool.partition_roles();
                if sources.is_empty() {
                    warn!("relay mode has no source-role sessions, nothing will be discovered");
                }
                if destinations.is_empty() {
                    warn!("relay mode has no destination-role sessions, files will only be staged");
                }
                (sources, destinations)
            }
            _ => (Vec::new(), Vec::new()),
        };
        Self {
            cfg,
            plan,
            pool,
            relay_sources,
            relay_destinations,
        }
    }

    pub(crate) async fn run(
        self,
        mut ctrl_rx: mpsc::Receiver<EngineCommand>,
        state_tx: watch::Sender<EngineState>,
    ) {
        let interval = self.cfg.interval();
        let _ = state_tx.send(EngineState::Running);
        info!("{} engine started, checking for new files every {:?}", self.plan.mode, interval);
        loop {
            tokio::select! {
                cmd = ctrl_rx.recv() => {
                    // A stop command or a dropped handle both end the loop.
                    let _ = cmd;
                    warn!("{} engine stopping", self.plan.mode);
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    self.run_pass().await;
                }
            }
        }
        let _ = state_tx.send(EngineState::Stopped);
    }

    /// One discovery-and-move pass over every edge of the active topology.
    /// All per-listing and per-file errors are logged and isolated; a pass
    /// never aborts early.
    pub(crate) async fn run_pass(&self) {
        for edge in self.edges() {
            let names = match self.discover(&edge.source).await {
                Ok(names) => names,
                Err(e) => {
                    error!("listing {} failed: {e:#}", edge.source.describe());
                    continue;
                }
            };
            if names.is_empty() {
                continue;
            }
            info!(
                "found {} new file(s) in {}: {:?}",
                names.len(),
                edge.source.describe(),
                names
            );
            for name in &names {
                self.move_file(&edge, name).await;
            }
        }
    }

    fn edges(&self) -> Vec<Edge<'_>> {
        let sessions = self.pool.sessions();
        match self.plan.mode {
            OpMode::LocalsToSftps => self
                .cfg
                .local_dirs
                .iter()
                .map(|dir| Edge {
                    source: FileSource::Local(dir.as_path()),
                    staging: Vec::new(),
                    deliver_to: sessions.iter().collect(),
                    keep_staging: true,
                    remove_source: self.plan.remove_source,
                })
                .collect(),
            OpMode::SftpsToLocals => sessions
                .iter()
                .map(|session| Edge {
                    source: FileSource::Remote(session),
                    staging: self.cfg.local_dirs.clone(),
                    deliver_to: Vec::new(),
                    keep_staging: true,
                    remove_source: self.plan.remove_source,
                })
                .collect(),
            OpMode::SftpsToSftps => self
                .relay_sources
                .iter()
                .map(|&idx| {
                    let source = &sessions[idx];
                    // Namespace staging per source so same-named files from
                    // two sources cannot clobber each other mid-pass.
                    let tag = source.endpoint().staging_tag();
                    Edge {
                        source: FileSource::Remote(source),
                        staging: self.cfg.local_dirs.iter().map(|d| d.join(&tag)).collect(),
                        deliver_to: self
                            .relay_destinations
                            .iter()
                            .map(|&d| &sessions[d])
                            .collect(),
                        keep_staging: self.plan.keep_local_copy,
                        remove_source: self.plan.remove_source,
                    }
                })
                .collect(),
        }
    }

    async fn discover(&self, source: &FileSource<'_>) -> anyhow::Result<Vec<String>> {
        match source {
            FileSource::Local(dir) => {
                let mut names = Vec::new();
                let mut entries = tokio::fs::read_dir(dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    if entry.file_type().await?.is_file() {
                        if let Some(name) = entry.file_name().to_str() {
                            names.push(name.to_string());
                        }
                    }
                }
                names.sort();
                Ok(names)
            }
            FileSource::Remote(session) => {
                let mut names = session.remote().list().await?;
                names.sort();
                Ok(names)
            }
        }
    }

    /// Move one file along an edge. Every step is failure-isolated: a failed
    /// fetch, delivery or deletion is logged and the remaining steps still
    /// run. Source removal is attempted only after every destination write
    /// was attempted, and never conditioned on delivery success.
    async fn move_file(&self, edge: &Edge<'_>, name: &str) {
        // Fetch to local storage.
        let staged: Vec<PathBuf> = match &edge.source {
            FileSource::Local(dir) => vec![dir.join(name)],
            FileSource::Remote(session) => {
                let mut staged = Vec::new();
                for dir in &edge.staging {
                    if let Err(e) = tokio::fs::create_dir_all(dir).await {
                        error!("creating {} failed: {e}", dir.display());
                        continue;
                    }
                    let target = dir.join(name);
                    match session.remote().download(name, &target).await {
                        Ok(()) => {
                            info!("\"{name}\" fetched from {} to {}", session.name(), target.display());
                            staged.push(target);
                        }
                        Err(e) => {
                            error!(
                                "fetching \"{name}\" from {} to {} failed: {e:#}",
                                session.name(),
                                dir.display()
                            );
                        }
                    }
                }
                staged
            }
        };

        // Deliver from local storage to every target session, independently.
        if !edge.deliver_to.is_empty() {
            match staged.first() {
                Some(local) => {
                    for session in &edge.deliver_to {
                        match session.remote().upload(local, name).await {
                            Ok(()) => info!("\"{name}\" delivered to {}", session.name()),
                            Err(e) => {
                                error!("delivering \"{name}\" to {} failed: {e:#}", session.name())
                            }
                        }
                    }
                }
                None => error!("no local copy of \"{name}\" was staged, skipping delivery"),
            }
        }

        // Drop staged copies unless this topology keeps them.
        if !edge.keep_staging {
            for path in &staged {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    error!("removing staged copy {} failed: {e}", path.display());
                }
            }
        }

        // Finally, the source copy.
        if edge.remove_source {
            let removed = match &edge.source {
                FileSource::Local(dir) => tokio::fs::remove_file(dir.join(name))
                    .await
                    .map_err(anyhow::Error::from),
                FileSource::Remote(session) => session.remote().remove(name).await,
            };
            match removed {
                Ok(()) => info!("\"{name}\" removed from {}", edge.source.describe()),
                Err(e) => error!(
                    "removing \"{name}\" from {} failed: {e:#}",
                    edge.source.describe()
                ),
            }
        } else {
            info!(
                "\"{name}\" copied from {} without removal",
                edge.source.describe()
            );
        }
    }
}
