//! Host configuration.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use sync_bridge::NotifyCfg;
use visibility_applier::RetryCfg;

/// Everything tunable about the host, with working defaults: the re-hide
/// retry budget and the completion-indicator lifetime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppCfg {
    pub retry: RetryCfg,
    pub notify: NotifyCfg,
}

impl AppCfg {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}
