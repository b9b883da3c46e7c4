//! Simulated TLS-enabled instance on disk.
//!
//! Lays out the files a real server produces when TLS is switched on (a
//! self-signed CA, a server certificate signed by it and its key) under a
//! test root, so the checks can run without a directory server.

use anyhow::{Context, Result};
use rcgen::{CertificateParams, IsCa, KeyPair};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dstls::config::DEFAULT_CA_LABEL;
use dstls::instance::ServerControl;
use dstls::layout::{unit_name, DsLayout, SELF_SIGNED_CA, SERVER_CERT, SERVER_CERT_KEY};

/// PEM material of a TLS-enabled instance.
pub struct TlsMaterial {
    pub ca_pem: String,
    pub cert_pem: String,
    pub key_pem: String,
}

/// Generate a self-signed CA and a server cert for `hostname` signed by it.
pub fn generate_tls_material(ca_label: &str, hostname: &str) -> Result<TlsMaterial> {
    let ca_key = KeyPair::generate().context("generate CA key pair")?;

    let mut ca_params = CertificateParams::default();
    ca_params.distinguished_name = rcgen::DistinguishedName::new();
    ca_params.distinguished_name.push(
        rcgen::DnType::CommonName,
        rcgen::DnValue::Utf8String(ca_label.to_string()),
    );
    ca_params.distinguished_name.push(
        rcgen::DnType::OrganizationName,
        rcgen::DnValue::Utf8String("testing".to_string()),
    );
    ca_params.is_ca = IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        rcgen::KeyUsagePurpose::KeyCertSign,
        rcgen::KeyUsagePurpose::CrlSign,
    ];
    let ca_cert = ca_params.self_signed(&ca_key).context("create CA certificate")?;

    let server_key = KeyPair::generate().context("generate server key")?;
    let mut params =
        CertificateParams::new(vec![hostname.to_string()]).context("create cert params")?;
    params.distinguished_name = rcgen::DistinguishedName::new();
    params.distinguished_name.push(
        rcgen::DnType::CommonName,
        rcgen::DnValue::Utf8String(hostname.to_string()),
    );
    params.is_ca = IsCa::NoCa;
    let cert = params
        .signed_by(&server_key, &ca_cert, &ca_key)
        .context("sign server cert")?;

    Ok(TlsMaterial {
        ca_pem: ca_cert.pem(),
        cert_pem: cert.pem(),
        key_pem: server_key.serialize_pem(),
    })
}

/// Write the three PEM artifacts into `dir`, creating it.
pub fn write_pem_artifacts(dir: &Path, material: &TlsMaterial) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    for (name, pem) in [
        (SELF_SIGNED_CA, &material.ca_pem),
        (SERVER_CERT, &material.cert_pem),
        (SERVER_CERT_KEY, &material.key_pem),
    ] {
        let mut f = fs::File::create(dir.join(name))?;
        f.write_all(pem.as_bytes())?;
    }
    Ok(())
}

/// Where the simulated server exports its PEM files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inside the service's private /tmp (1.4.3 and later).
    PrivateTmp,
    /// In the instance config dir (before 1.4.3).
    InstanceDir,
}

/// A [`ServerControl`] that writes TLS material beneath a test root.
pub struct SimulatedInstance {
    serverid: String,
    layout: DsLayout,
    placement: Placement,
    namespace_id: String,
    ca_label: String,
}

static NEXT_NAMESPACE: AtomicU32 = AtomicU32::new(0);

/// 32 hex chars like systemd's boot-unique id; pid and counter keep
/// instances created in the same clock tick apart.
fn namespace_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let seq = NEXT_NAMESPACE.fetch_add(1, Ordering::Relaxed);
    format!("{nanos:016x}{:08x}{seq:08x}", std::process::id())
}

impl SimulatedInstance {
    pub fn new(serverid: impl Into<String>, root: impl Into<PathBuf>, placement: Placement) -> Self {
        Self {
            serverid: serverid.into(),
            layout: DsLayout::new(root),
            placement,
            namespace_id: namespace_id(),
            ca_label: DEFAULT_CA_LABEL.to_string(),
        }
    }

    pub fn with_ca_label(mut self, label: impl Into<String>) -> Self {
        self.ca_label = label.into();
        self
    }

    pub fn layout(&self) -> &DsLayout {
        &self.layout
    }

    /// Host-side root of the service's private /tmp.
    pub fn private_tmp_root(&self) -> PathBuf {
        self.layout.tmp_dir().join(format!(
            "systemd-private-{}-{}-{}",
            self.namespace_id,
            unit_name(&self.serverid),
            &self.namespace_id[24..]
        ))
    }

    /// The instance's directory inside its private /tmp.
    pub fn private_cert_dir(&self) -> PathBuf {
        self.private_tmp_root()
            .join("tmp")
            .join(format!("slapd-{}", self.serverid))
    }

    /// Create the instance config dir, as instance creation would.
    pub fn create(&self) -> Result<()> {
        let dir = self.layout.instance_config_dir(&self.serverid);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(())
    }
}

impl ServerControl for SimulatedInstance {
    fn serverid(&self) -> &str {
        &self.serverid
    }

    fn enable_tls(&self) -> Result<()> {
        self.create()?;
        let material = generate_tls_material(&self.ca_label, "localhost.localdomain")?;
        let dir = match self.placement {
            Placement::PrivateTmp => self.private_cert_dir(),
            Placement::InstanceDir => self.layout.instance_config_dir(&self.serverid),
        };
        tracing::debug!("writing simulated TLS material to {}", dir.display());
        write_pem_artifacts(&dir, &material)
    }
}
