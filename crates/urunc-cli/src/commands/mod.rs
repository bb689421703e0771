//! CLI command definitions and dispatch.

pub mod inspect;
pub mod setup;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use urunc_common::config::NetworkConfig;
use urunc_network::netns::NetNamespace;

/// urunc-net: Unikernel guest networking for container namespaces.
#[derive(Parser, Debug)]
#[command(name = "urunc-net", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file. Flags below override its values.
    #[arg(long, global = true, env = "URUNC_NET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Primary interface of the namespace.
    #[arg(long, global = true)]
    pub interface: Option<String>,

    /// Tap MTU. Defaults to the MTU of the primary interface.
    #[arg(long, global = true)]
    pub mtu: Option<u32>,

    /// Owner uid of the tap device.
    #[arg(long, global = true)]
    pub uid: Option<u32>,

    /// Owner gid of the tap device.
    #[arg(long, global = true)]
    pub gid: Option<u32>,

    /// Directory for per-namespace lock files.
    #[arg(long, global = true, conflicts_with = "no_lock")]
    pub lock_dir: Option<PathBuf>,

    /// Do not serialize setups through the namespace lock.
    #[arg(long, global = true)]
    pub no_lock: bool,

    /// Run against an in-memory copy of the namespace; nothing is changed.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare networking for one guest and print its descriptor.
    Setup(setup::SetupArgs),
    /// Print the discovered primary interface.
    Inspect(inspect::InspectArgs),
}

impl Cli {
    /// Loads the configuration file, if any, and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is
    /// invalid.
    pub fn network_config(&self) -> anyhow::Result<NetworkConfig> {
        let mut config = match &self.config {
            Some(path) => NetworkConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NetworkConfig::default(),
        };
        if let Some(interface) = &self.interface {
            config.primary_interface.clone_from(interface);
        }
        if self.mtu.is_some() {
            config.mtu = self.mtu;
        }
        if let Some(uid) = self.uid {
            config.owner_uid = uid;
        }
        if let Some(gid) = self.gid {
            config.owner_gid = gid;
        }
        if let Some(dir) = &self.lock_dir {
            config.lock_dir = Some(dir.clone());
        }
        // A dry run never touches the host, so it takes no host lock either.
        if self.no_lock || self.dry_run {
            config.lock_dir = None;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
#[cfg(target_os = "linux")]
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    use urunc_network::netns::{HostNamespace, MemoryNamespace};

    let config = cli.network_config()?;
    let host = HostNamespace::new();
    if cli.dry_run {
        let ns = MemoryNamespace::snapshot(&host).context("reading current namespace")?;
        tracing::info!("dry run: kernel state will not be modified");
        dispatch(cli.command, config, ns)
    } else {
        dispatch(cli.command, config, host)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Always fails: network namespaces are Linux-only.
#[cfg(not(target_os = "linux"))]
pub fn execute(_cli: Cli) -> anyhow::Result<()> {
    anyhow::bail!("urunc-net requires Linux network namespaces")
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn dispatch<N: NetNamespace>(command: Command, config: NetworkConfig, ns: N) -> anyhow::Result<()> {
    match command {
        Command::Setup(args) => setup::execute(&args, config, ns),
        Command::Inspect(args) => inspect::execute(&args, &config, &ns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "urunc-net",
            "--interface",
            "ens3",
            "--mtu",
            "1400",
            "--uid",
            "1000",
            "setup",
            "--policy",
            "dynamic",
        ]);
        let config = cli.network_config().unwrap();
        assert_eq!(config.primary_interface, "ens3");
        assert_eq!(config.mtu, Some(1400));
        assert_eq!(config.owner_uid, 1000);
        assert_eq!(config.owner_gid, 0);
    }

    #[test]
    fn dry_run_disables_the_lock() {
        let cli = Cli::parse_from(["urunc-net", "--dry-run", "setup", "--policy", "static"]);
        assert!(cli.network_config().unwrap().lock_dir.is_none());
    }

    #[test]
    fn lock_dir_and_no_lock_conflict() {
        let parsed =
            Cli::try_parse_from(["urunc-net", "--lock-dir", "/tmp/l", "--no-lock", "inspect"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::parse_from(["urunc-net", "--mtu", "0", "inspect"]);
        assert!(cli.network_config().is_err());
    }
}
