//! TLS certificate placement checks.
//!
//! Each check is a fixed sequence of steps: act on the server, ask the OS,
//! compare. The first failing step ends the check since every later step
//! depends on it.

use std::fmt;

use crate::cert;
use crate::instance::ServerControl;
use crate::layout::{self, DsLayout, PEM_ARTIFACTS, SELF_SIGNED_CA};
use crate::platform::{ServiceManager, TrustStore};
use crate::systemd;
use crate::trust;
use crate::version::{ds_is_older, private_tmp_pem, self_signed_ca, DsVersion, Gate};

pub const PEM_IN_PRIVATE_NAMESPACE: &str = "pem_cert_in_private_namespace";
pub const CERT_CATEGORY_AUTHORITY: &str = "cert_category_authority";

/// Everything a check talks to.
pub struct CheckContext<'a> {
    pub server: &'a dyn ServerControl,
    pub services: &'a dyn ServiceManager,
    pub trust: &'a dyn TrustStore,
    pub layout: DsLayout,
    pub version: DsVersion,
    /// Label the instance CA shows up with in `trust list`.
    pub ca_label: String,
    /// Run `enable_tls` first; off when TLS is already configured.
    pub enable_tls: bool,
    /// Drop the trust anchor again after the authority check.
    pub remove_anchor: bool,
    pub with_systemd: bool,
}

/// Result of a single step.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StepResult {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped(String),
    /// Failed under an expected-failure gate.
    XFailed(String),
    /// Passed under an expected-failure gate.
    XPassed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASSED"),
            Outcome::Failed => write!(f, "FAILED"),
            Outcome::Skipped(r) => write!(f, "SKIPPED ({r})"),
            Outcome::XFailed(r) => write!(f, "XFAIL ({r})"),
            Outcome::XPassed => write!(f, "XPASS"),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    pub name: &'static str,
    pub outcome: Outcome,
    pub steps: Vec<StepResult>,
}

impl CheckReport {
    /// Counts against the run (expected failures do not).
    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Step recorder; `record` returns whether the check may continue.
#[derive(Default)]
struct Steps(Vec<StepResult>);

impl Steps {
    fn record(&mut self, ok: bool, message: impl Into<String>) -> bool {
        let message = message.into();
        if ok {
            tracing::info!("{message}");
        } else {
            tracing::warn!("{message}");
        }
        self.0.push(StepResult { ok, message });
        ok
    }

    fn all_ok(&self) -> bool {
        self.0.iter().all(|s| s.ok)
    }
}

fn finish(name: &'static str, gate: Gate, steps: Steps) -> CheckReport {
    let passed = steps.all_ok();
    let outcome = match (gate, passed) {
        (Gate::ExpectFail(reason), false) => Outcome::XFailed(reason),
        (Gate::ExpectFail(_), true) => Outcome::XPassed,
        (_, true) => Outcome::Passed,
        (_, false) => Outcome::Failed,
    };
    tracing::info!("{name}: {outcome}");
    CheckReport {
        name,
        outcome,
        steps: steps.0,
    }
}

fn skipped(name: &'static str, reason: String) -> CheckReport {
    tracing::info!("{name}: skipped: {reason}");
    CheckReport {
        name,
        outcome: Outcome::Skipped(reason),
        steps: Vec::new(),
    }
}

/// Gate for the private /tmp check.
pub fn namespace_gate(with_systemd: bool, version: &DsVersion) -> Gate {
    if !with_systemd {
        Gate::Skip("Will not run without systemd".to_string())
    } else if ds_is_older(version, &private_tmp_pem()) {
        Gate::Skip("Not implemented".to_string())
    } else {
        Gate::Run
    }
}

/// Gate for the trust category check.
pub fn authority_gate(version: &DsVersion) -> Gate {
    if ds_is_older(version, &self_signed_ca()) {
        Gate::Skip("Not implemented".to_string())
    } else if ds_is_older(version, &private_tmp_pem()) {
        Gate::ExpectFail("Might fail because of bz1809279".to_string())
    } else {
        Gate::Run
    }
}

fn enable_tls(ctx: &CheckContext<'_>, steps: &mut Steps) -> bool {
    if !ctx.enable_tls {
        return steps.record(true, "TLS enable skipped (already configured)");
    }
    tracing::info!("Enable TLS");
    match ctx.server.enable_tls() {
        Ok(()) => steps.record(true, "TLS enabled"),
        Err(e) => steps.record(false, format!("enable TLS failed: {e:#}")),
    }
}

/// PEM files live in the service's private /tmp, not in /etc/dirsrv.
pub fn check_pem_in_private_namespace(ctx: &CheckContext<'_>) -> CheckReport {
    let name = PEM_IN_PRIVATE_NAMESPACE;
    let gate = namespace_gate(ctx.with_systemd, &ctx.version);
    if let Gate::Skip(reason) = gate {
        return skipped(name, reason);
    }
    let mut steps = Steps::default();
    pem_in_private_namespace_steps(ctx, &mut steps);
    finish(name, gate, steps)
}

fn pem_in_private_namespace_steps(ctx: &CheckContext<'_>, steps: &mut Steps) -> bool {
    let serverid = ctx.server.serverid();
    if !enable_tls(ctx, steps) {
        return false;
    }

    tracing::info!("Checking PrivateTmp value");
    let unit = layout::unit_name(serverid);
    let ok = match systemd::private_tmp_enabled(ctx.services, &unit) {
        Ok(true) => steps.record(true, format!("{unit} has PrivateTmp=yes")),
        Ok(false) => steps.record(false, format!("{unit} does not have PrivateTmp=yes")),
        Err(e) => steps.record(false, format!("cannot read PrivateTmp of {unit}: {e:#}")),
    };
    if !ok {
        return false;
    }

    tracing::info!("Check files in private /tmp");
    let private_dir = match ctx.layout.private_cert_dir(serverid) {
        Ok(dir) => {
            steps.record(true, format!("private cert dir {}", dir.display()));
            dir
        }
        Err(e) => return steps.record(false, format!("{e:#}")),
    };
    let missing = layout::missing_artifacts(&private_dir);
    let ok = if missing.is_empty() {
        steps.record(
            true,
            format!(
                "{} present in private /tmp ({})",
                PEM_ARTIFACTS.join(", "),
                private_dir.display()
            ),
        )
    } else {
        steps.record(
            false,
            format!(
                "missing from private /tmp ({}): {}",
                private_dir.display(),
                missing.join(", ")
            ),
        )
    };
    if !ok {
        return false;
    }

    tracing::info!("Check instance cert directory");
    let instance_dir = ctx.layout.instance_config_dir(serverid);
    if !steps.record(
        instance_dir.is_dir(),
        format!("instance dir {} exists", instance_dir.display()),
    ) {
        return false;
    }
    let leftover = layout::present_artifacts(&instance_dir);
    if leftover.is_empty() {
        steps.record(true, format!("no PEM files in {}", instance_dir.display()))
    } else {
        steps.record(
            false,
            format!(
                "PEM files in {}: {}",
                instance_dir.display(),
                leftover.join(", ")
            ),
        )
    }
}

/// The instance CA is an `authority` once anchored in the trust store.
pub fn check_cert_category_authority(ctx: &CheckContext<'_>) -> CheckReport {
    let name = CERT_CATEGORY_AUTHORITY;
    let gate = authority_gate(&ctx.version);
    if let Gate::Skip(reason) = gate {
        return skipped(name, reason);
    }
    let mut steps = Steps::default();
    cert_category_authority_steps(ctx, &mut steps);
    finish(name, gate, steps)
}

fn cert_category_authority_steps(ctx: &CheckContext<'_>, steps: &mut Steps) -> bool {
    let serverid = ctx.server.serverid();
    if !enable_tls(ctx, steps) {
        return false;
    }

    tracing::info!("Get certificate path");
    let cert_dir = match ctx.layout.cert_dir(serverid, &ctx.version) {
        Ok(dir) => dir,
        Err(e) => return steps.record(false, format!("{e:#}")),
    };
    let signed_cert = cert_dir.join(SELF_SIGNED_CA);
    if !steps.record(
        signed_cert.exists(),
        format!("{SELF_SIGNED_CA} present ({})", signed_cert.display()),
    ) {
        return false;
    }

    let ok = match cert::read_cert_summary(&signed_cert) {
        Ok(summary) if summary.is_ca => steps.record(
            true,
            format!(
                "{SELF_SIGNED_CA} is a CA certificate (CN={})",
                summary.subject_cn.as_deref().unwrap_or("?")
            ),
        ),
        Ok(_) => steps.record(false, format!("{SELF_SIGNED_CA} is not a CA certificate")),
        Err(e) => steps.record(false, format!("{e:#}")),
    };
    if !ok {
        return false;
    }

    let ok = match trust::anchor_with_store(ctx.trust, &signed_cert) {
        Ok(()) => steps.record(true, format!("anchored {}", signed_cert.display())),
        Err(e) => steps.record(false, format!("trust anchor failed: {e:#}")),
    };
    if !ok {
        return false;
    }

    tracing::info!("Search if our certificate has category: authority");
    let label = &ctx.ca_label;
    let found = match trust::list_with_store(ctx.trust) {
        Ok(entries) => match trust::find_authority(&entries, label) {
            Some(_) => steps.record(true, format!("{label} listed with category: authority")),
            None => steps.record(
                false,
                format!("no trust entry labelled {label} with category: authority"),
            ),
        },
        Err(e) => steps.record(false, format!("trust list failed: {e:#}")),
    };

    let mut cleaned = true;
    if ctx.remove_anchor {
        cleaned = match trust::remove_anchor_with_store(ctx.trust, &signed_cert) {
            Ok(()) => steps.record(true, format!("removed anchor {}", signed_cert.display())),
            Err(e) => steps.record(false, format!("trust anchor --remove failed: {e:#}")),
        };
    }
    found && cleaned
}

/// Run both checks in order.
pub fn run_all(ctx: &CheckContext<'_>) -> Vec<CheckReport> {
    vec![
        check_pem_in_private_namespace(ctx),
        check_cert_category_authority(ctx),
    ]
}
