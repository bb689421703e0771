//! `urunc-net setup`: Prepare networking for one guest.

use anyhow::Context;
use clap::Args;
use urunc_common::config::NetworkConfig;
use urunc_network::NetworkManager;
use urunc_network::netns::NetNamespace;
use urunc_unikernel::{UnikernelParams, new_unikernel};

use crate::output;

/// Arguments for the `setup` command.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Network policy: `static` or `dynamic`.
    #[arg(long, env = "URUNC_NETWORK_POLICY")]
    pub policy: String,

    /// Print the boot command line of this unikernel type instead of the
    /// descriptor.
    #[arg(long)]
    pub unikernel: Option<String>,

    /// Container command line passed to the unikernel builder.
    #[arg(long, default_value = "", requires = "unikernel")]
    pub cmdline: String,
}

/// Executes the `setup` command.
///
/// # Errors
///
/// Returns an error if the policy is unknown or setup fails.
pub fn execute<N: NetNamespace>(
    args: &SetupArgs,
    config: NetworkConfig,
    ns: N,
) -> anyhow::Result<()> {
    let manager = NetworkManager::new(&args.policy, config, ns)?;
    let info = manager.setup().context("network setup failed")?;

    match &args.unikernel {
        Some(kind) => {
            let mut unikernel = new_unikernel(kind)?;
            unikernel.init(&UnikernelParams::from_network(&info, args.cmdline.as_str()))?;
            println!("{}", unikernel.command_string()?);
        }
        None => println!("{}", output::to_json(&info)?),
    }
    Ok(())
}
