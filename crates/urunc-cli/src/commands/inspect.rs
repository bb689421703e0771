//! `urunc-net inspect`: Show the primary interface of the namespace.

use clap::Args;
use urunc_common::config::NetworkConfig;
use urunc_network::inspector::InterfaceInspector;
use urunc_network::netns::NetNamespace;

use crate::output;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Interface to inspect instead of the configured primary interface.
    pub name: Option<String>,
}

/// Executes the `inspect` command.
///
/// # Errors
///
/// Returns an error if the interface cannot be discovered.
pub fn execute<N: NetNamespace>(
    args: &InspectArgs,
    config: &NetworkConfig,
    ns: &N,
) -> anyhow::Result<()> {
    let name = args.name.as_deref().unwrap_or(&config.primary_interface);
    let interface = InterfaceInspector::new(ns).discover(name)?;
    println!("{}", output::to_json(&interface)?);
    Ok(())
}
