//! Discovery of the namespace's pre-existing primary interface.

use std::net::IpAddr;

use urunc_common::error::{NetworkError, Result};
use urunc_common::types::{Interface, dotted_mask};

use crate::netns::NetNamespace;

/// Reads address, netmask, and gateway of an existing interface.
#[derive(Debug)]
pub struct InterfaceInspector<'a, N> {
    ns: &'a N,
}

impl<'a, N: NetNamespace> InterfaceInspector<'a, N> {
    /// Inspects interfaces of `ns`.
    #[must_use]
    pub const fn new(ns: &'a N) -> Self {
        Self { ns }
    }

    /// Succeeds if an interface called `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InterfaceNotFound`] if it does not, or
    /// [`NetworkError::LinkEnumerationFailed`] if interfaces cannot be listed.
    pub fn ensure_exists(&self, name: &str) -> Result<()> {
        let links = self
            .ns
            .link_names()
            .map_err(|source| NetworkError::LinkEnumerationFailed { source })?;
        if links.iter().any(|link| link == name) {
            return Ok(());
        }
        Err(NetworkError::InterfaceNotFound {
            name: name.to_string(),
        })
    }

    /// Captures the first non-loopback IPv4 address of `name`, its netmask in
    /// dotted-decimal notation, and the namespace default gateway.
    ///
    /// # Errors
    ///
    /// Returns `InterfaceNotFound`, `NoIpv4Address`, `MaskNotFound`, or
    /// `GatewayDiscoveryFailed` for the step that could not be completed.
    pub fn discover(&self, name: &str) -> Result<Interface> {
        self.ensure_exists(name)?;

        let addresses = self
            .ns
            .link_addresses(name)
            .map_err(|source| NetworkError::LinkEnumerationFailed { source })?;
        let (ip, netmask) = addresses
            .iter()
            .find_map(|addr| match addr.address {
                IpAddr::V4(ip) if !ip.is_loopback() => Some((ip, addr.netmask)),
                _ => None,
            })
            .ok_or_else(|| NetworkError::NoIpv4Address {
                name: name.to_string(),
            })?;

        // Boot parameters expect dotted-decimal, not hex or a prefix length.
        let mask = match netmask {
            Some(IpAddr::V4(mask)) => dotted_mask(&mask.octets()),
            _ => {
                return Err(NetworkError::MaskNotFound {
                    name: name.to_string(),
                });
            }
        };

        let gateway = self
            .ns
            .default_gateway()
            .map_err(|e| NetworkError::GatewayDiscoveryFailed {
                message: e.to_string(),
            })?
            .ok_or_else(|| NetworkError::GatewayDiscoveryFailed {
                message: "no IPv4 default route".into(),
            })?;

        tracing::debug!(interface = name, %ip, mask = %mask, %gateway, "discovered interface");
        Ok(Interface {
            ip: ip.to_string(),
            default_gateway: gateway.to_string(),
            mask,
            interface: name.to_string(),
        })
    }
}
