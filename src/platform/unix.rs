//! Linux implementations: p11-kit `trust` and `systemctl`.

use anyhow::{Context, Result};
use std::path::Path;

use super::{run_command, ServiceManager, TrustStore};

pub struct P11KitTrust {
    program: String,
}

impl P11KitTrust {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TrustStore for P11KitTrust {
    fn anchor(&self, pem_path: &Path) -> Result<()> {
        let path = pem_path.to_string_lossy();
        run_command(&self.program, &["anchor", &path])
            .with_context(|| format!("trust anchor {}", pem_path.display()))?;
        Ok(())
    }

    fn remove_anchor(&self, pem_path: &Path) -> Result<()> {
        let path = pem_path.to_string_lossy();
        run_command(&self.program, &["anchor", "--remove", &path])
            .with_context(|| format!("trust anchor --remove {}", pem_path.display()))?;
        Ok(())
    }

    fn list(&self) -> Result<String> {
        run_command(&self.program, &["list"]).context("trust list")
    }
}

pub struct Systemctl {
    program: String,
}

impl Systemctl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ServiceManager for Systemctl {
    fn show_property(&self, unit: &str, property: &str) -> Result<String> {
        run_command(&self.program, &["show", "-p", property, unit])
            .with_context(|| format!("systemctl show -p {property} {unit}"))
    }
}
