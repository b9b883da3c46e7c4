//! Configuration loading and path resolution.
//!
//! Supports DSTLS_CONFIG and DSTLS_ROOT env var overrides for testing.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Label p11-kit shows for the CA lib389 generates.
pub const DEFAULT_CA_LABEL: &str = "ssca.389ds.example.com";

/// Main config.toml structure.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instance name without the `slapd-` prefix.
    pub serverid: Option<String>,
    /// Installed server version; detected with `commands.version` when unset.
    pub version: Option<String>,
    /// Filesystem root all layout paths are resolved under.
    pub root: PathBuf,
    pub ca_label: String,
    pub commands: Commands,
}

/// External programs, overridable for non-standard installs and tests.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Commands {
    pub systemctl: String,
    pub trust: String,
    /// Commands run in order to turn TLS on; `{serverid}` is substituted.
    pub enable_tls: Vec<Vec<String>>,
    /// Command printing the installed server version on stdout.
    pub version: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serverid: None,
            version: None,
            root: PathBuf::from("/"),
            ca_label: DEFAULT_CA_LABEL.to_string(),
            commands: Commands::default(),
        }
    }
}

impl Default for Commands {
    fn default() -> Self {
        let argv = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            systemctl: "systemctl".to_string(),
            trust: "trust".to_string(),
            enable_tls: vec![
                argv(&["dsconf", "{serverid}", "security", "enable"]),
                argv(&["systemctl", "restart", "dirsrv@{serverid}.service"]),
            ],
            version: argv(&["rpm", "-q", "--qf", "%{VERSION}", "389-ds-base"]),
        }
    }
}

/// Path to config.toml (respects DSTLS_CONFIG).
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("DSTLS_CONFIG") {
        PathBuf::from(p)
    } else if let Some(dirs) = directories::ProjectDirs::from("org", "389ds", "dstls") {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("dstls.toml")
    }
}

impl Config {
    /// Load config from `path` (with shared lock when file exists).
    ///
    /// A missing file yields defaults. DSTLS_ROOT overrides `root`.
    pub fn load(path: &Path) -> Result<Config> {
        let mut cfg = if path.is_file() {
            let mut file = fs::OpenOptions::new()
                .read(true)
                .open(path)
                .with_context(|| format!("open config: {}", path.display()))?;
            fs2::FileExt::lock_shared(&file)?;
            use std::io::Read;
            let mut s = String::new();
            file.read_to_string(&mut s)?;
            toml::from_str(&s).with_context(|| format!("parse config: {}", path.display()))?
        } else {
            Config::default()
        };
        if let Ok(root) = std::env::var("DSTLS_ROOT") {
            cfg.root = PathBuf::from(root);
        }
        Ok(cfg)
    }
}
