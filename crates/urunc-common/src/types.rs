//! Domain types exchanged between the network managers and their consumers.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;
use crate::constants::{MAX_IFNAME_LEN, TEMPLATE_PLACEHOLDER};
use crate::error::{NetworkError, Result};

/// Snapshot of a discovered interface.
///
/// Produced once per setup call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interface {
    /// IPv4 address of the interface.
    pub ip: String,
    /// Default gateway of the namespace.
    pub default_gateway: String,
    /// Netmask in dotted-decimal notation.
    pub mask: String,
    /// Interface name.
    pub interface: String,
}

/// Descriptor handed to the unikernel configuration builders.
///
/// Carries no live handles. Once returned it has no relationship with kernel
/// state and may outlive the setup call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnikernelNetworkInfo {
    /// Device the guest's VMM attaches to.
    pub tap_device: String,
    /// The namespace's original interface.
    pub eth_device: Interface,
}

/// Deployment policy selecting a network manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPolicy {
    /// One guest per namespace, using the primary interface directly.
    Static,
    /// Several guests per namespace, one tap device each.
    Dynamic,
}

impl FromStr for NetworkPolicy {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(NetworkError::UnsupportedPolicy {
                policy: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for NetworkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Name and address of a tap device, both derived from its ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TapIdentity {
    /// Position of the device among the namespace's tap devices.
    pub ordinal: usize,
    /// Interface name.
    pub name: String,
    /// Address assigned to the device.
    pub address: Ipv4Addr,
    /// Prefix length of the device subnet.
    pub prefix_len: u8,
}

impl TapIdentity {
    /// Renders the name and address templates of `config` for `ordinal`.
    ///
    /// The name receives the ordinal, the address receives the ordinal plus
    /// one, so ordinal 0 maps to `tap0_urunc` and `172.16.1.2/24`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`] if the rendered name does not fit an
    /// interface name or the rendered address is not a valid IPv4 address.
    pub fn derive(ordinal: usize, config: &NetworkConfig) -> Result<Self> {
        let placeholder = TEMPLATE_PLACEHOLDER.to_string();
        let name = config
            .tap_name_template
            .replace(&placeholder, &ordinal.to_string());
        if name.len() > MAX_IFNAME_LEN {
            return Err(NetworkError::Config {
                message: format!("tap name {name} exceeds {MAX_IFNAME_LEN} characters"),
            });
        }
        let rendered = config
            .tap_ip_template
            .replace(&placeholder, &(ordinal + 1).to_string());
        let address = rendered
            .parse::<Ipv4Addr>()
            .map_err(|e| NetworkError::Config {
                message: format!("tap address {rendered} for ordinal {ordinal}: {e}"),
            })?;
        Ok(Self {
            ordinal,
            name,
            address,
            prefix_len: config.tap_prefix_len,
        })
    }

    /// Address in CIDR notation.
    #[must_use]
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_len)
    }
}

/// Renders mask bytes in dotted-decimal notation, one decimal per byte.
#[must_use]
pub fn dotted_mask(mask: &[u8]) -> String {
    mask.iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Expands an IPv4 prefix length into its netmask.
///
/// Returns `None` for prefix lengths above 32.
#[must_use]
pub fn prefix_to_mask(prefix_len: u8) -> Option<Ipv4Addr> {
    match prefix_len {
        0 => Some(Ipv4Addr::UNSPECIFIED),
        1..=32 => Some(Ipv4Addr::from(u32::MAX << (32 - u32::from(prefix_len)))),
        _ => None,
    }
}

/// Recovers the prefix length from a dotted-decimal netmask.
///
/// Returns `None` if the string is not an address or the set bits are not
/// contiguous from the top.
#[must_use]
pub fn mask_to_prefix(mask: &str) -> Option<u8> {
    let bits = u32::from(mask.parse::<Ipv4Addr>().ok()?);
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) != 0 {
        return None;
    }
    u8::try_from(ones).ok()
}
