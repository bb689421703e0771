//! # urunc-unikernel
//!
//! Boot parameter builders for unikernel guests.
//!
//! A builder is initialised from [`UnikernelParams`], which carry the
//! container command line and the network descriptor produced by
//! `urunc-network`, and renders the command line the VMM passes to the
//! guest.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod error;
pub mod mewz;

use serde::{Deserialize, Serialize};
use urunc_common::types::UnikernelNetworkInfo;

pub use error::{Result, UnikernelError};
pub use mewz::Mewz;

/// Inputs shared by every unikernel builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnikernelParams {
    /// Command line of the container, passed through to the guest.
    pub cmdline: String,
    /// Device the VMM attaches the guest NIC to.
    pub tap_device: String,
    /// IPv4 address of the namespace's primary interface.
    pub eth_device_ip: String,
    /// Netmask of that address, dotted-decimal.
    pub eth_device_mask: String,
    /// Default gateway of the namespace.
    pub eth_device_gateway: String,
}

impl UnikernelParams {
    /// Builds the parameters for a guest attached through `info`.
    #[must_use]
    pub fn from_network(info: &UnikernelNetworkInfo, cmdline: impl Into<String>) -> Self {
        Self {
            cmdline: cmdline.into(),
            tap_device: info.tap_device.clone(),
            eth_device_ip: info.eth_device.ip.clone(),
            eth_device_mask: info.eth_device.mask.clone(),
            eth_device_gateway: info.eth_device.default_gateway.clone(),
        }
    }
}

/// A unikernel whose boot command line can be rendered.
pub trait Unikernel: std::fmt::Debug {
    /// Captures the parameters the command line is built from.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter cannot be represented for this guest.
    fn init(&mut self, params: &UnikernelParams) -> Result<()>;

    /// Command line handed to the guest.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder was not initialised.
    fn command_string(&self) -> Result<String>;

    /// Whether the guest can boot from a block device.
    fn supports_block(&self) -> bool;

    /// Whether the guest can mount a file system of type `fs_type`.
    fn supports_fs(&self, fs_type: &str) -> bool;
}

/// Returns an uninitialised builder for the unikernel type `kind`.
///
/// # Errors
///
/// Returns [`UnikernelError::Unsupported`] for an unknown type.
pub fn new_unikernel(kind: &str) -> Result<Box<dyn Unikernel>> {
    match kind {
        mewz::MEWZ_UNIKERNEL => Ok(Box::new(Mewz::default())),
        other => Err(UnikernelError::Unsupported {
            kind: other.to_string(),
        }),
    }
}
