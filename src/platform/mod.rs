//! Platform abstraction for the trust store and the service manager.

pub mod unix;

use anyhow::Result;
use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::error::DsError;

/// Trait for OS trust store operations.
pub trait TrustStore: Send + Sync {
    /// Register a PEM certificate as a trust anchor.
    fn anchor(&self, pem_path: &Path) -> Result<()>;
    /// Remove a previously registered anchor.
    fn remove_anchor(&self, pem_path: &Path) -> Result<()>;
    /// Raw listing of trust store entries.
    fn list(&self) -> Result<String>;
}

/// Trait for service manager queries.
pub trait ServiceManager: Send + Sync {
    /// Raw `Property=value` output for one unit property.
    fn show_property(&self, unit: &str, property: &str) -> Result<String>;
}

/// Get the trust store named by the config (p11-kit `trust` by default).
pub fn default_trust_store(config: &Config) -> Box<dyn TrustStore> {
    Box::new(unix::P11KitTrust::new(&config.commands.trust))
}

/// Get the service manager named by the config (`systemctl` by default).
pub fn default_service_manager(config: &Config) -> Box<dyn ServiceManager> {
    Box::new(unix::Systemctl::new(&config.commands.systemctl))
}

/// Render argv the way a shell user would type it (for logs).
pub fn format_cmd(program: &str, args: &[&str]) -> String {
    let mut out = String::from(program);
    for a in args {
        out.push(' ');
        if a.is_empty() || a.contains(char::is_whitespace) {
            out.push('\'');
            out.push_str(a);
            out.push('\'');
        } else {
            out.push_str(a);
        }
    }
    out
}

/// Run a command to completion and return its stdout.
///
/// A non-zero exit becomes [`DsError::CommandFailed`] carrying stderr.
pub fn run_command(program: &str, args: &[&str]) -> Result<String> {
    tracing::debug!("Command used : {}", format_cmd(program, args));
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| DsError::CommandNotFound {
            program: program.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(DsError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
