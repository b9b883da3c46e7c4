//! Installed server version and the version gates checks declare.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fmt;

use crate::config::Config;
use crate::error::DsError;

/// Dotted numeric version such as `1.4.3.39` or `2.4.0`.
///
/// Missing trailing components compare as zero, so `1.4.3 == 1.4.3.0`.
#[derive(Debug, Clone)]
pub struct DsVersion {
    parts: Vec<u64>,
}

/// First release that exports PEM files into the private /tmp.
pub fn private_tmp_pem() -> DsVersion {
    DsVersion::from_parts(&[1, 4, 3])
}

/// First release that generates a self-signed CA on TLS setup.
pub fn self_signed_ca() -> DsVersion {
    DsVersion::from_parts(&[1, 4, 0])
}

impl DsVersion {
    pub fn from_parts(parts: &[u64]) -> Self {
        Self {
            parts: parts.to_vec(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DsError> {
        let s = raw.trim();
        // `2.4.0-1.el9` style package versions: keep the upstream part.
        let upstream = s.split(['-', '~', '+']).next().unwrap_or("");
        let mut parts = Vec::new();
        for comp in upstream.split('.') {
            match comp.parse::<u64>() {
                Ok(n) => parts.push(n),
                Err(_) => break,
            }
        }
        if parts.is_empty() {
            return Err(DsError::InvalidVersion(raw.to_string()));
        }
        Ok(Self { parts })
    }

    fn component(&self, i: usize) -> u64 {
        self.parts.get(i).copied().unwrap_or(0)
    }

    /// `self < other`.
    pub fn is_older(&self, other: &DsVersion) -> bool {
        self.cmp(other) == Ordering::Less
    }
}

impl PartialEq for DsVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DsVersion {}

impl PartialOrd for DsVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DsVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let n = self.parts.len().max(other.parts.len());
        (0..n)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for DsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        f.write_str(&s.join("."))
    }
}

impl std::str::FromStr for DsVersion {
    type Err = DsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The installed server predates `reference`; every version gate asks this.
pub fn ds_is_older(installed: &DsVersion, reference: &DsVersion) -> bool {
    installed.is_older(reference)
}

/// Configured version, or the output of the configured version command.
pub fn detect_version(config: &Config) -> Result<DsVersion> {
    if let Some(v) = &config.version {
        return Ok(DsVersion::parse(v)?);
    }
    let (program, args) = config
        .commands
        .version
        .split_first()
        .context("no version configured and commands.version is empty")?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = crate::platform::run_command(program, &args).context("detect server version")?;
    let version = DsVersion::parse(&out)?;
    tracing::debug!("detected server version {version}");
    Ok(version)
}

/// Whether and how a check runs against the installed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Run,
    Skip(String),
    /// Run, but a failure is a known defect rather than a regression.
    ExpectFail(String),
}
