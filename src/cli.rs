//! CLI definitions and command routing.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::checks::{self, CheckContext, CheckReport};
use crate::config::{config_path, Config};
use crate::instance::DsInstance;
use crate::layout::{self, DsLayout};
use crate::platform;
use crate::version::{self, DsVersion};

#[derive(Parser)]
#[command(name = "dstls")]
#[command(about = "Check where a 389 Directory Server instance keeps its TLS certificates")]
pub struct Cli {
    /// Config file (default: DSTLS_CONFIG or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Resolve /etc, /tmp and /run beneath this directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// PEM files are in the service's private /tmp, not in /etc/dirsrv
    Namespace(CheckArgs),

    /// The instance CA is listed as category: authority once trusted
    Authority {
        #[command(flatten)]
        args: CheckArgs,
        /// Remove the trust anchor again afterwards
        #[arg(long)]
        remove_anchor: bool,
    },

    /// Run both checks
    All {
        #[command(flatten)]
        args: CheckArgs,
        /// Remove the trust anchor again afterwards
        #[arg(long)]
        remove_anchor: bool,
    },

    /// Print the certificate locations for an instance (for scripting)
    Paths {
        /// Instance name without the slapd- prefix
        serverid: Option<String>,
    },

    /// List trust store entries, optionally only those with a label
    TrustList {
        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Args)]
pub struct CheckArgs {
    /// Instance name without the slapd- prefix
    pub serverid: Option<String>,

    /// TLS is already enabled; do not run the enable commands
    #[arg(long)]
    pub no_enable_tls: bool,

    /// Installed server version (skips detection)
    #[arg(long)]
    pub ds_version: Option<String>,

    /// Report format: one line per step, or a JSON array of reports
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy)]
enum Which {
    Namespace,
    Authority,
    All,
}

/// Run CLI and dispatch to handlers.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init_cli_logger(cli.verbose);

    let path = cli.config.clone().unwrap_or_else(config_path);
    let mut config = Config::load(&path)?;
    if let Some(root) = cli.root {
        config.root = root;
    }

    match cli.command {
        Commands::Namespace(args) => cmd_check(&config, args, false, Which::Namespace),
        Commands::Authority {
            args,
            remove_anchor,
        } => cmd_check(&config, args, remove_anchor, Which::Authority),
        Commands::All {
            args,
            remove_anchor,
        } => cmd_check(&config, args, remove_anchor, Which::All),
        Commands::Paths { serverid } => cmd_paths(&config, serverid),
        Commands::TrustList { label } => cmd_trust_list(&config, label),
    }
}

fn resolve_serverid(config: &Config, arg: Option<String>) -> Result<String> {
    arg.or_else(|| config.serverid.clone())
        .context("no serverid given and none configured")
}

fn cmd_check(config: &Config, args: CheckArgs, remove_anchor: bool, which: Which) -> Result<()> {
    let serverid = resolve_serverid(config, args.serverid)?;
    let version = match &args.ds_version {
        Some(v) => DsVersion::parse(v)?,
        None => version::detect_version(config)?,
    };

    let server = DsInstance::from_config(&serverid, config);
    let services = platform::default_service_manager(config);
    let trust = platform::default_trust_store(config);
    let ctx = CheckContext {
        server: &server,
        services: services.as_ref(),
        trust: trust.as_ref(),
        layout: DsLayout::new(&config.root),
        version,
        ca_label: config.ca_label.clone(),
        enable_tls: !args.no_enable_tls,
        remove_anchor,
        with_systemd: crate::systemd::with_systemd(&config.root),
    };

    let reports = match which {
        Which::Namespace => vec![checks::check_pem_in_private_namespace(&ctx)],
        Which::Authority => vec![checks::check_cert_category_authority(&ctx)],
        Which::All => checks::run_all(&ctx),
    };

    match args.format {
        Format::Text => print_text(&reports),
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(())
}

fn print_text(reports: &[CheckReport]) {
    for report in reports {
        for step in &report.steps {
            let mark = if step.ok { "ok" } else { "FAIL" };
            println!("[{mark}] {}", step.message);
        }
        println!("{}: {}", report.name, report.outcome);
    }
}

fn cmd_paths(config: &Config, serverid: Option<String>) -> Result<()> {
    let serverid = resolve_serverid(config, serverid)?;
    let layout = DsLayout::new(&config.root);
    println!("unit\t{}", layout::unit_name(&serverid));
    println!(
        "instance\t{}",
        layout.instance_config_dir(&serverid).display()
    );
    println!("pattern\t{}", layout.private_tmp_pattern(&serverid));
    for dir in layout.find_private_cert_dirs(&serverid)? {
        println!("private\t{}", dir.display());
    }
    Ok(())
}

fn cmd_trust_list(config: &Config, label: Option<String>) -> Result<()> {
    let store = platform::default_trust_store(config);
    let entries = crate::trust::list_with_store(store.as_ref())?;
    for e in entries
        .iter()
        .filter(|e| label.is_none() || e.label == label)
    {
        println!(
            "{}\t{}\t{}",
            e.label.as_deref().unwrap_or("-"),
            e.category.as_deref().unwrap_or("-"),
            e.trust.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
