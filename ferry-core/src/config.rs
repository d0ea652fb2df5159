use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Immutable process configuration. Built once by the caller (CLI) and passed
/// by reference into the pool manager, the engine and the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transfer engine poll interval in seconds.
    #[serde(default = "Config::default_interval_secs")]
    pub interval_secs: u64,
    /// Supervisor liveness-probe interval; defaults to `interval_secs`.
    #[serde(default)]
    pub health_interval_secs: Option<u64>,
    /// Local directories watched (fan-out) or delivered into (fan-in, relay staging).
    #[serde(default)]
    pub local_dirs: Vec<PathBuf>,
    /// Ordered mode toggles; the first enabled entry selects the engine.
    #[serde(default)]
    pub modes: Vec<ModeToggle>,
    /// Ordered remote endpoints; insertion order is pool order.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl Config {
    fn default_interval_secs() -> u64 {
        30
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    pub fn health_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.health_interval_secs.unwrap_or(self.interval_secs))
    }

    /// Resolve the active engine plan: first enabled toggle wins.
    pub fn first_enabled_mode(&self) -> Option<EnginePlan> {
        self.modes.iter().find_map(ModeToggle::plan)
    }
}

/// The three transfer topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpMode {
    LocalsToSftps,
    SftpsToLocals,
    SftpsToSftps,
}

impl fmt::Display for OpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpMode::LocalsToSftps => "locals_to_sftps",
            OpMode::SftpsToLocals => "sftps_to_locals",
            OpMode::SftpsToSftps => "sftps_to_sftps",
        };
        f.write_str(s)
    }
}

/// One entry of the ordered mode list, carrying its mode-specific flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeToggle {
    LocalsToSftps {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        remove_source_file: bool,
    },
    SftpsToLocals {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        remove_source_file: bool,
    },
    SftpsToSftps {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        remove_source_file: bool,
        #[serde(default = "default_true")]
        keep_copy_in_local: bool,
    },
}

fn default_true() -> bool {
    true
}

impl ModeToggle {
    pub fn plan(&self) -> Option<EnginePlan> {
        match *self {
            ModeToggle::LocalsToSftps {
                enabled,
                remove_source_file,
            } => enabled.then_some(EnginePlan {
                mode: OpMode::LocalsToSftps,
                remove_source: remove_source_file,
                keep_local_copy: true,
            }),
            ModeToggle::SftpsToLocals {
                enabled,
                remove_source_file,
            } => enabled.then_some(EnginePlan {
                mode: OpMode::SftpsToLocals,
                remove_source: remove_source_file,
                keep_local_copy: true,
            }),
            ModeToggle::SftpsToSftps {
                enabled,
                remove_source_file,
                keep_copy_in_local,
            } => enabled.then_some(EnginePlan {
                mode: OpMode::SftpsToSftps,
                remove_source: remove_source_file,
                keep_local_copy: keep_copy_in_local,
            }),
        }
    }
}

/// Resolved engine parameters, fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct EnginePlan {
    pub mode: OpMode,
    pub remove_source: bool,
    /// Whether files fetched into local storage survive the pass. Always true
    /// for fan-in (the local copy is the delivery); the relay keep-copy flag
    /// otherwise.
    pub keep_local_copy: bool,
}

/// Session role, used by relay mode to partition the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Destination,
    #[default]
    Any,
}

/// One remote endpoint descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub host: String,
    #[serde(default = "EndpointConfig::default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Remote working directory; resolved at connect time.
    pub path: String,
    #[serde(default)]
    pub role: Role,
    /// Allowed host key fingerprints (OpenSSH SHA256 base64) or raw base64 keys.
    #[serde(default)]
    pub fingerprints: Option<Vec<String>>,
}

impl EndpointConfig {
    fn default_port() -> u16 {
        22
    }

    /// Display name used in logs and errors.
    pub fn display_name(&self) -> String {
        format!(
            "{}@{}:{}{}",
            self.username, self.host, self.port, self.path
        )
    }

    /// Filesystem-safe tag used to namespace relay staging per source.
    pub fn staging_tag(&self) -> String {
        format!("{}_{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let cfg: Config = serde_yaml::from_str("local_dirs: [/in]").unwrap();
        assert_eq!(cfg.interval_secs, 30);
        assert_eq!(cfg.health_interval(), std::time::Duration::from_secs(30));
        assert!(cfg.modes.is_empty());
        assert!(cfg.first_enabled_mode().is_none());
    }

    #[test]
    fn first_enabled_mode_wins_in_order() {
        let cfg: Config = serde_yaml::from_str(
            r#"
local_dirs: [/in]
modes:
  - mode: locals_to_sftps
    enabled: false
    remove_source_file: true
  - mode: sftps_to_sftps
    enabled: true
    remove_source_file: true
    keep_copy_in_local: false
  - mode: sftps_to_locals
    enabled: true
"#,
        )
        .unwrap();
        let plan = cfg.first_enabled_mode().unwrap();
        assert_eq!(plan.mode, OpMode::SftpsToSftps);
        assert!(plan.remove_source);
        assert!(!plan.keep_local_copy);
    }

    #[test]
    fn endpoint_defaults_and_names() {
        let ep: EndpointConfig = serde_yaml::from_str(
            r#"
host: files.example.com
username: deploy
path: /outbox
"#,
        )
        .unwrap();
        assert_eq!(ep.port, 22);
        assert_eq!(ep.role, Role::Any);
        assert_eq!(ep.display_name(), "deploy@files.example.com:22/outbox");
        assert_eq!(ep.staging_tag(), "files.example.com_22");
    }
}
