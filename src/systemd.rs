//! Service manager queries.

use anyhow::Result;
use std::path::Path;

use crate::platform::ServiceManager;

pub const PRIVATE_TMP: &str = "PrivateTmp";

/// True when the unit runs with its own /tmp (`PrivateTmp=yes`).
pub fn private_tmp_enabled(manager: &dyn ServiceManager, unit: &str) -> Result<bool> {
    let out = manager.show_property(unit, PRIVATE_TMP)?;
    tracing::debug!("{unit}: {}", out.trim());
    Ok(out.contains("PrivateTmp=yes"))
}

/// Systemd is the running service manager on the host rooted at `root`.
pub fn with_systemd(root: &Path) -> bool {
    root.join("run").join("systemd").join("system").is_dir()
}
