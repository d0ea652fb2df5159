//! Shared test fixtures.

use std::path::{Path, PathBuf};

use crate::config::{Config, EndpointConfig, Role};

pub fn endpoint(host: &str, role: Role) -> EndpointConfig {
    EndpointConfig {
        host: host.to_string(),
        port: 22,
        username: "u".to_string(),
        password: Some("secret".to_string()),
        path: "/data".to_string(),
        role,
        fingerprints: None,
    }
}

pub fn config_with(local_dirs: Vec<PathBuf>, endpoints: Vec<EndpointConfig>) -> Config {
    Config {
        interval_secs: 1,
        health_interval_secs: None,
        local_dirs,
        modes: Vec::new(),
        endpoints,
    }
}

pub fn config_with_endpoints(endpoints: Vec<EndpointConfig>) -> Config {
    config_with(Vec::new(), endpoints)
}

pub fn write_file(path: impl AsRef<Path>, content: &[u8]) {
    std::fs::write(path, content).unwrap();
}

/// Poll `cond` while letting timers and the blocking pool make progress.
/// Under a paused clock each sleep advances virtual time, so this converges
/// quickly without racing in-flight file operations.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}
