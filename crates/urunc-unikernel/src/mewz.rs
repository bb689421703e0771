//! Mewz, a unikernel that reads its network setup from the boot command
//! line as `<address>/<prefix> <gateway> `.

use urunc_common::types::mask_to_prefix;

use crate::error::{Result, UnikernelError};
use crate::{Unikernel, UnikernelParams};

/// Type name of the Mewz unikernel.
pub const MEWZ_UNIKERNEL: &str = "mewz";

/// Network part of the Mewz command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MewzNet {
    /// Guest address.
    pub address: String,
    /// Prefix length of the guest subnet.
    pub prefix_len: u8,
    /// Default gateway.
    pub gateway: String,
}

/// Mewz boot parameter builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mewz {
    command: String,
    net: Option<MewzNet>,
}

impl Mewz {
    /// Container command, trimmed. Mewz does not consume it.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Network parameters captured by `init`.
    #[must_use]
    pub const fn net(&self) -> Option<&MewzNet> {
        self.net.as_ref()
    }
}

impl Unikernel for Mewz {
    fn init(&mut self, params: &UnikernelParams) -> Result<()> {
        // The prefix follows the discovered mask instead of assuming /24.
        let prefix_len = mask_to_prefix(&params.eth_device_mask).ok_or_else(|| {
            UnikernelError::InvalidParameter {
                kind: MEWZ_UNIKERNEL,
                field: "netmask",
                value: params.eth_device_mask.clone(),
            }
        })?;
        self.command = params.cmdline.trim().to_string();
        self.net = Some(MewzNet {
            address: params.eth_device_ip.clone(),
            prefix_len,
            gateway: params.eth_device_gateway.clone(),
        });
        tracing::debug!(
            address = %params.eth_device_ip,
            prefix_len,
            gateway = %params.eth_device_gateway,
            "mewz network parameters"
        );
        Ok(())
    }

    fn command_string(&self) -> Result<String> {
        let net = self.net.as_ref().ok_or(UnikernelError::NotInitialized {
            kind: MEWZ_UNIKERNEL,
        })?;
        Ok(format!("{}/{} {} ", net.address, net.prefix_len, net.gateway))
    }

    fn supports_block(&self) -> bool {
        false
    }

    fn supports_fs(&self, _fs_type: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mask: &str) -> UnikernelParams {
        UnikernelParams {
            cmdline: "  serve --port 80 ".into(),
            tap_device: "tap0_urunc".into(),
            eth_device_ip: "10.0.0.5".into(),
            eth_device_mask: mask.into(),
            eth_device_gateway: "10.0.0.1".into(),
        }
    }

    #[test]
    fn command_line_carries_address_prefix_and_gateway() {
        let mut mewz = Mewz::default();
        mewz.init(&params("255.255.255.0")).unwrap();
        assert_eq!(mewz.command_string().unwrap(), "10.0.0.5/24 10.0.0.1 ");
        assert_eq!(mewz.command(), "serve --port 80");
    }

    #[test]
    fn prefix_follows_the_discovered_mask() {
        let mut mewz = Mewz::default();
        mewz.init(&params("255.255.240.0")).unwrap();
        assert_eq!(mewz.command_string().unwrap(), "10.0.0.5/20 10.0.0.1 ");
    }

    #[test]
    fn non_contiguous_mask_is_rejected() {
        let mut mewz = Mewz::default();
        let err = mewz.init(&params("255.0.255.0")).unwrap_err();
        assert!(matches!(err, UnikernelError::InvalidParameter { field: "netmask", .. }));
        assert!(mewz.net().is_none());
    }

    #[test]
    fn command_line_requires_init() {
        let err = Mewz::default().command_string().unwrap_err();
        assert_eq!(err.to_string(), "mewz was not initialised");
    }

    #[test]
    fn no_block_or_filesystem_support() {
        let mewz = Mewz::default();
        assert!(!mewz.supports_block());
        assert!(!mewz.supports_fs("ext4"));
        assert!(!mewz.supports_fs("9pfs"));
    }
}
