//! Server control: the instance under test.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::platform::run_command;

/// The operations checks need from a directory server instance.
pub trait ServerControl {
    /// Instance name without the `slapd-` prefix.
    fn serverid(&self) -> &str;
    /// Generate and install TLS material, restarting as needed.
    fn enable_tls(&self) -> Result<()>;
}

/// A locally installed instance driven through its admin commands.
#[derive(Debug, Clone)]
pub struct DsInstance {
    serverid: String,
    enable_tls_commands: Vec<Vec<String>>,
}

impl DsInstance {
    pub fn new(serverid: impl Into<String>, enable_tls_commands: Vec<Vec<String>>) -> Self {
        Self {
            serverid: serverid.into(),
            enable_tls_commands,
        }
    }

    pub fn from_config(serverid: impl Into<String>, config: &Config) -> Self {
        Self::new(serverid, config.commands.enable_tls.clone())
    }

    fn expand(&self, arg: &str) -> String {
        arg.replace("{serverid}", &self.serverid)
    }
}

impl ServerControl for DsInstance {
    fn serverid(&self) -> &str {
        &self.serverid
    }

    fn enable_tls(&self) -> Result<()> {
        for argv in &self.enable_tls_commands {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            let program = self.expand(program);
            let args: Vec<String> = args.iter().map(|a| self.expand(a)).collect();
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            run_command(&program, &args)
                .with_context(|| format!("enable TLS on slapd-{}", self.serverid))?;
        }
        Ok(())
    }
}
