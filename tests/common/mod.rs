//! Shared test helpers.
#![allow(dead_code)]

pub mod fixture;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dstls::cert::read_cert_summary;
use dstls::checks::CheckContext;
use dstls::config::DEFAULT_CA_LABEL;
use dstls::instance::ServerControl;
use dstls::layout::DsLayout;
use dstls::platform::{ServiceManager, TrustStore};
use dstls::version::DsVersion;
use tempfile::TempDir;

/// Temp directory used as the filesystem root of a simulated host.
pub fn temp_root() -> TempDir {
    let dir = tempfile::Builder::new()
        .prefix("dstls_test_")
        .tempdir()
        .expect("temp dir");
    std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
    dir
}

/// Mark the simulated host as running systemd.
pub fn fake_systemd(root: &Path) {
    std::fs::create_dir_all(root.join("run/systemd/system")).unwrap();
}

/// Service manager answering every property query with a fixed value.
pub struct FixedServiceManager {
    pub private_tmp: bool,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl FixedServiceManager {
    pub fn new(private_tmp: bool) -> Self {
        Self {
            private_tmp,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl ServiceManager for FixedServiceManager {
    fn show_property(&self, unit: &str, property: &str) -> anyhow::Result<String> {
        self.queries
            .lock()
            .unwrap()
            .push((unit.to_string(), property.to_string()));
        let v = if self.private_tmp { "yes" } else { "no" };
        Ok(format!("{property}={v}\n"))
    }
}

/// Trust store that lists anchored certs the way p11-kit does.
#[derive(Default)]
pub struct MockTrustStore {
    pub anchored: Mutex<Vec<PathBuf>>,
    pub removed: Mutex<Vec<PathBuf>>,
    pub fail_anchor: bool,
}

impl MockTrustStore {
    pub fn anchored(&self) -> Vec<PathBuf> {
        self.anchored.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }
}

impl TrustStore for MockTrustStore {
    fn anchor(&self, pem_path: &Path) -> anyhow::Result<()> {
        if self.fail_anchor {
            anyhow::bail!("p11-kit: couldn't write: Permission denied");
        }
        self.anchored.lock().unwrap().push(pem_path.to_path_buf());
        Ok(())
    }

    fn remove_anchor(&self, pem_path: &Path) -> anyhow::Result<()> {
        self.removed.lock().unwrap().push(pem_path.to_path_buf());
        self.anchored.lock().unwrap().retain(|p| p != pem_path);
        Ok(())
    }

    fn list(&self) -> anyhow::Result<String> {
        let mut out = String::from(
            "pkcs11:id=%00;type=cert\n    type: certificate\n    label: ISRG Root X1\n    trust: anchor\n    category: authority\n",
        );
        for (i, path) in self.anchored().iter().enumerate() {
            let summary = read_cert_summary(path)?;
            let category = if summary.is_ca { "authority" } else { "other-entry" };
            out.push_str(&format!(
                "\npkcs11:id=%{:02X};type=cert\n    type: certificate\n    label: {}\n    trust: anchor\n    category: {}\n",
                i + 1,
                summary.subject_cn.unwrap_or_default(),
                category
            ));
        }
        Ok(out)
    }
}

/// Check context over a simulated root with systemd present.
pub fn context<'a>(
    server: &'a dyn ServerControl,
    services: &'a dyn ServiceManager,
    trust: &'a dyn TrustStore,
    root: &Path,
    version: &str,
) -> CheckContext<'a> {
    CheckContext {
        server,
        services,
        trust,
        layout: DsLayout::new(root),
        version: DsVersion::parse(version).unwrap(),
        ca_label: DEFAULT_CA_LABEL.to_string(),
        enable_tls: true,
        remove_anchor: false,
        with_systemd: true,
    }
}
