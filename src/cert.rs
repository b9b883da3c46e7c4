//! PEM certificate inspection.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use x509_parser::prelude::{FromDer, X509Certificate, X509Name};

/// What the checks need to know about a certificate.
#[derive(Debug, Clone)]
pub struct CertSummary {
    pub subject_cn: Option<String>,
    pub issuer_cn: Option<String>,
    pub is_ca: bool,
}

fn common_name(name: &X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}

/// Summarize the first certificate in a PEM file.
pub fn read_cert_summary(path: &Path) -> Result<CertSummary> {
    let pem = fs::read(path).with_context(|| format!("read cert: {}", path.display()))?;
    let cert_der = rustls_pemfile::certs(&mut pem.as_slice())
        .next()
        .and_then(|r| r.ok())
        .with_context(|| format!("no certificate in {}", path.display()))?;

    let (_, cert) = X509Certificate::from_der(cert_der.as_ref())
        .map_err(|e| anyhow::anyhow!("parse X.509 {}: {e:?}", path.display()))?;

    let is_ca = matches!(cert.basic_constraints(), Ok(Some(bc)) if bc.value.ca);

    Ok(CertSummary {
        subject_cn: common_name(cert.subject()),
        issuer_cn: common_name(cert.issuer()),
        is_ca,
    })
}
