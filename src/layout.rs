//! Where a 389 DS instance keeps its TLS material.
//!
//! Servers from 1.4.3 on export PEM files into the service's private /tmp
//! (`PrivateTmp=yes`), which the host sees as
//! `/tmp/systemd-private-<rand>-dirsrv@<serverid>.service-<rand>/tmp/`.
//! Older servers write them next to the NSS database in `/etc/dirsrv`.

use anyhow::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::DsError;
use crate::version::{ds_is_older, private_tmp_pem, DsVersion};

pub const SELF_SIGNED_CA: &str = "Self-Signed-CA.pem";
pub const SERVER_CERT_KEY: &str = "Server-Cert-Key.pem";
pub const SERVER_CERT: &str = "Server-Cert.pem";

/// PEM files a TLS-enabled instance exports.
pub const PEM_ARTIFACTS: [&str; 3] = [SELF_SIGNED_CA, SERVER_CERT_KEY, SERVER_CERT];

/// Path layout beneath a filesystem root (`/` outside of tests).
#[derive(Debug, Clone)]
pub struct DsLayout {
    pub root: PathBuf,
}

/// Systemd unit name for an instance.
pub fn unit_name(serverid: &str) -> String {
    format!("dirsrv@{serverid}.service")
}

impl DsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persistent instance config dir, `/etc/dirsrv/slapd-<serverid>`.
    pub fn instance_config_dir(&self, serverid: &str) -> PathBuf {
        self.root
            .join("etc")
            .join("dirsrv")
            .join(format!("slapd-{serverid}"))
    }

    /// Host-side /tmp directory.
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Glob for the instance's directory inside its private /tmp.
    pub fn private_tmp_pattern(&self, serverid: &str) -> String {
        let tmp = Pattern::escape(&self.tmp_dir().to_string_lossy());
        let sid = Pattern::escape(serverid);
        format!("{tmp}/systemd-private-*-dirsrv@{sid}.service-*/tmp/slapd-{sid}")
    }

    /// All matching private cert dirs, most recently modified first.
    ///
    /// Old namespaces of stopped services can linger until the next tmpfiles
    /// cleanup, so more than one match is possible.
    pub fn find_private_cert_dirs(&self, serverid: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.private_tmp_pattern(serverid);
        let mut dirs: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!("skipping unreadable glob entry: {e}");
                    continue;
                }
            };
            if !path.is_dir() {
                continue;
            }
            let mtime = path
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            dirs.push((mtime, path));
        }
        dirs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(dirs.into_iter().map(|(_, p)| p).collect())
    }

    /// The current private cert dir.
    pub fn private_cert_dir(&self, serverid: &str) -> Result<PathBuf> {
        self.find_private_cert_dirs(serverid)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                DsError::NoPrivateCertDir {
                    pattern: self.private_tmp_pattern(serverid),
                }
                .into()
            })
    }

    /// Directory holding PEM files for the given server version.
    pub fn cert_dir(&self, serverid: &str, version: &DsVersion) -> Result<PathBuf> {
        if ds_is_older(version, &private_tmp_pem()) {
            Ok(self.instance_config_dir(serverid))
        } else {
            self.private_cert_dir(serverid)
        }
    }
}

/// Artifacts from [`PEM_ARTIFACTS`] that exist in `dir`.
pub fn present_artifacts(dir: &Path) -> Vec<&'static str> {
    PEM_ARTIFACTS
        .iter()
        .copied()
        .filter(|name| dir.join(name).exists())
        .collect()
}

/// Artifacts from [`PEM_ARTIFACTS`] missing from `dir`.
pub fn missing_artifacts(dir: &Path) -> Vec<&'static str> {
    PEM_ARTIFACTS
        .iter()
        .copied()
        .filter(|name| !dir.join(name).exists())
        .collect()
}
