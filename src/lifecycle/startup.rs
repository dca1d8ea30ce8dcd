//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared telemetry handles from the live config
//! - Start the metrics exporter
//! - Start the config watcher and reloader when a config file is in use
//!
//! # Design Decisions
//! - Fail fast: a watcher that cannot be installed is a startup error
//! - Background tasks subscribe to shutdown before the listener starts

use std::path::Path;

use notify::RecommendedWatcher;
use tokio::task::JoinHandle;

use crate::config::watcher::{apply_updates, ConfigWatcher};
use crate::config::SharedConfig;
use crate::lifecycle::Shutdown;
use crate::telemetry::Telemetry;

/// Background machinery started before the server accepts traffic.
pub struct Started {
    pub telemetry: Telemetry,
    pub exporter: JoinHandle<()>,
    /// Dropping the watcher stops reloads.
    _watcher: Option<RecommendedWatcher>,
}

/// Start telemetry and, if `config_path` is given, hot reload of that file.
pub fn start(
    config: SharedConfig,
    config_path: Option<&Path>,
    shutdown: &Shutdown,
) -> Result<Started, notify::Error> {
    let telemetry = Telemetry::new(config.clone());
    let exporter = telemetry.spawn_exporter(shutdown.subscribe());

    let watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            tokio::spawn(apply_updates(config, updates, shutdown.subscribe()));
            Some(handle)
        }
        None => None,
    };

    Ok(Started {
        telemetry,
        exporter,
        _watcher: watcher,
    })
}
