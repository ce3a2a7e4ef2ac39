//! Gatehouse CLI
//!
//! Talks to the policy engine with the same namespacing and endpoints the
//! guards use: ask for a decision, read or edit a caller's policy record.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gatehouse_core::PolicyEngineConfig;
use gatehouse_policy::HttpPolicyEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::check::{self, CheckArgs};
use commands::policy::{self, PolicyCommand};

#[derive(Parser, Debug)]
#[command(name = "gatehouse")]
#[command(about = "Gatehouse - policy engine access for guarded services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML or JSON)
    #[arg(short, long, global = true, default_value = "gatehouse.toml")]
    config: PathBuf,

    /// Policy engine admin URL, overriding file and environment
    #[arg(long, global = true)]
    admin_url: Option<String>,

    /// Root organization identifier, overriding file and environment
    #[arg(long, global = true)]
    root_org: Option<String>,
}

impl Cli {
    /// Configuration layer made of the flags given on the command line.
    /// Unset flags stay at their defaults and leave lower layers alone.
    fn overrides(&self) -> PolicyEngineConfig {
        let mut overrides = PolicyEngineConfig::default();
        if let Some(url) = &self.admin_url {
            overrides.admin_url = url.clone();
        }
        if let Some(org) = &self.root_org {
            overrides.root_org_identifier = org.clone();
        }
        overrides
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the engine whether a caller may perform an action on a resource
    Check(CheckArgs),

    /// Policy record operations
    #[command(subcommand)]
    Policy(PolicyCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::load_config(&cli.config, &cli.overrides())?;
    let engine = HttpPolicyEngine::new(config.clone())?;

    let output = match &cli.command {
        Commands::Check(args) => check::run(args, &config, &engine).await?,
        Commands::Policy(cmd) => policy::run(cmd, &engine).await?,
    };
    println!("{output}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from([
            "gatehouse",
            "-v",
            "check",
            "--action",
            "update",
            "--subject",
            "U1",
            "--resource",
            "E1",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("gatehouse.toml"));
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.action, "update");
                assert_eq!(args.flavor, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_policy_id() {
        let cli = Cli::try_parse_from([
            "gatehouse",
            "policy",
            "id",
            "--user",
            "U1",
            "--service",
            "Widgets",
            "--config",
            "/etc/gatehouse.json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/gatehouse.json"));
        assert!(matches!(
            cli.command,
            Commands::Policy(PolicyCommand::Id { .. })
        ));
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "gatehouse",
            "policy",
            "get",
            "user:U1:Widgets",
            "--admin-url",
            "http://keto.staging:4456",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.admin_url, "http://keto.staging:4456");
        assert_eq!(
            overrides.root_org_identifier,
            PolicyEngineConfig::default().root_org_identifier
        );
    }

    #[test]
    fn test_check_requires_resource() {
        assert!(Cli::try_parse_from([
            "gatehouse",
            "check",
            "--action",
            "update",
            "--subject",
            "U1"
        ])
        .is_err());
    }
}
