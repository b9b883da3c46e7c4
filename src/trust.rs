//! Trust store anchoring and `trust list` parsing.

use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::platform::TrustStore;

/// One record of `trust list` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustEntry {
    pub uri: String,
    pub kind: Option<String>,
    pub label: Option<String>,
    pub trust: Option<String>,
    pub category: Option<String>,
}

impl TrustEntry {
    pub fn is_authority(&self) -> bool {
        self.category.as_deref() == Some("authority")
    }
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s+([a-z][a-z0-9-]*):\s*(.*?)\s*$").expect("field regex is valid")
    })
}

/// Parse `trust list` output.
///
/// Records start with a `pkcs11:` URI line; indented `key: value` lines
/// belong to the current record. Unknown keys are ignored.
pub fn parse_trust_list(output: &str) -> Vec<TrustEntry> {
    let mut entries = Vec::new();
    let mut current: Option<TrustEntry> = None;
    for line in output.lines() {
        if line.starts_with("pkcs11:") {
            if let Some(e) = current.take() {
                entries.push(e);
            }
            current = Some(TrustEntry {
                uri: line.trim().to_string(),
                ..TrustEntry::default()
            });
            continue;
        }
        let Some(entry) = current.as_mut() else {
            continue;
        };
        let Some(caps) = field_re().captures(line) else {
            continue;
        };
        let value = Some(caps[2].to_string());
        match &caps[1] {
            "type" => entry.kind = value,
            "label" => entry.label = value,
            "trust" => entry.trust = value,
            "category" => entry.category = value,
            _ => {}
        }
    }
    if let Some(e) = current {
        entries.push(e);
    }
    entries
}

/// First entry with this label categorized as `authority`.
pub fn find_authority<'a>(entries: &'a [TrustEntry], label: &str) -> Option<&'a TrustEntry> {
    entries
        .iter()
        .find(|e| e.label.as_deref() == Some(label) && e.is_authority())
}

/// Listing contains a record labelled `label` with `category: authority`.
pub fn listing_has_authority(output: &str, label: &str) -> bool {
    find_authority(&parse_trust_list(output), label).is_some()
}

/// Anchor a CA PEM using the provided store.
pub fn anchor_with_store(store: &dyn TrustStore, pem_path: &Path) -> Result<()> {
    tracing::info!("Trust the certificate {}", pem_path.display());
    store.anchor(pem_path)
}

/// Remove an anchor using the provided store.
pub fn remove_anchor_with_store(store: &dyn TrustStore, pem_path: &Path) -> Result<()> {
    tracing::info!("Remove trust anchor {}", pem_path.display());
    store.remove_anchor(pem_path)
}

/// List and parse entries of the provided store.
pub fn list_with_store(store: &dyn TrustStore) -> Result<Vec<TrustEntry>> {
    Ok(parse_trust_list(&store.list()?))
}
