//! Tap device creation for VMM consumption.
//!
//! Devices are link-layer taps with a single queue and virtio-net headers,
//! persistent so they outlive the creating process, and owned by the user
//! the VMM runs as. A device is handed out as a [`ProvisionedTap`] that
//! removes it again unless the setup that created it commits.

use std::io;
use std::net::Ipv4Addr;

use urunc_common::error::{NetworkError, Result};

use crate::netns::NetNamespace;

/// Creates tap devices in a namespace.
#[derive(Debug)]
pub struct TapDeviceManager<'a, N> {
    ns: &'a N,
}

impl<'a, N: NetNamespace> TapDeviceManager<'a, N> {
    /// Creates devices in `ns`.
    #[must_use]
    pub const fn new(ns: &'a N) -> Self {
        Self { ns }
    }

    /// Creates the tap device `name`, hands every queue to
    /// `owner_uid:owner_gid`, and sets its MTU.
    ///
    /// An existing interface with the same name is an error; it is never
    /// reused. If ownership or MTU cannot be set the new device is removed
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TapCreationFailed`, `OwnershipSetFailed`, or `MtuSetFailed`.
    pub fn create_tap(
        &self,
        name: &str,
        mtu: u32,
        owner_uid: u32,
        owner_gid: u32,
    ) -> Result<ProvisionedTap<'a, N>> {
        let existing = self
            .ns
            .link_names()
            .map_err(|source| NetworkError::LinkEnumerationFailed { source })?;
        if existing.iter().any(|link| link == name) {
            return Err(NetworkError::TapCreationFailed {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "interface already exists"),
            });
        }

        tracing::info!(tap = name, mtu, owner_uid, owner_gid, "creating tap device");
        let queues = self
            .ns
            .add_tap(name)
            .map_err(|source| NetworkError::TapCreationFailed {
                name: name.to_string(),
                source,
            })?;
        let tap = ProvisionedTap {
            ns: self.ns,
            name: name.to_string(),
            committed: false,
        };

        // A single-queue tap cannot be reattached for deletion while a queue
        // is open, so the queues go before the guard can roll back.
        let owned = self.set_ownership(name, &queues, owner_uid, owner_gid);
        drop(queues);
        owned?;

        self.ns
            .set_link_mtu(name, mtu)
            .map_err(|source| NetworkError::MtuSetFailed {
                name: name.to_string(),
                mtu,
                source,
            })?;
        Ok(tap)
    }

    fn set_ownership(
        &self,
        name: &str,
        queues: &[N::TapQueue],
        owner_uid: u32,
        owner_gid: u32,
    ) -> Result<()> {
        for queue in queues {
            self.ns
                .set_tap_owner(queue, owner_uid)
                .map_err(|source| NetworkError::OwnershipSetFailed {
                    name: name.to_string(),
                    kind: "owner uid",
                    id: owner_uid,
                    source,
                })?;
            self.ns
                .set_tap_group(queue, owner_gid)
                .map_err(|source| NetworkError::OwnershipSetFailed {
                    name: name.to_string(),
                    kind: "group gid",
                    id: owner_gid,
                    source,
                })?;
        }
        Ok(())
    }
}

/// A tap device created by the current setup.
///
/// Dropping it without [`commit`](Self::commit) deletes the device.
#[derive(Debug)]
pub struct ProvisionedTap<'a, N: NetNamespace> {
    ns: &'a N,
    name: String,
    committed: bool,
}

impl<N: NetNamespace> ProvisionedTap<'_, N> {
    /// Device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds `address/prefix_len` to the device.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AddressSetFailed`] if the kernel rejects it.
    pub fn assign_address(&self, address: Ipv4Addr, prefix_len: u8) -> Result<()> {
        self.ns
            .add_ipv4_address(&self.name, address, prefix_len)
            .map_err(|source| NetworkError::AddressSetFailed {
                name: self.name.clone(),
                address: format!("{address}/{prefix_len}"),
                source,
            })
    }

    /// Brings the device up.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::LinkUpFailed`] if the kernel rejects it.
    pub fn set_up(&self) -> Result<()> {
        self.ns
            .set_link_up(&self.name)
            .map_err(|source| NetworkError::LinkUpFailed {
                name: self.name.clone(),
                source,
            })
    }

    /// Keeps the device and returns its name.
    #[must_use]
    pub fn commit(mut self) -> String {
        self.committed = true;
        std::mem::take(&mut self.name)
    }
}

impl<N: NetNamespace> Drop for ProvisionedTap<'_, N> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.ns.delete_tap(&self.name) {
            Ok(()) => tracing::info!(tap = %self.name, "removed tap device after failed setup"),
            Err(e) => tracing::warn!(
                tap = %self.name,
                error = %e,
                "failed to remove tap device after failed setup"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netns::{FailPoint, MemoryNamespace};

    fn namespace() -> MemoryNamespace {
        MemoryNamespace::new("net:[1]").with_link("eth0", 1500)
    }

    #[test]
    fn created_tap_has_owner_group_and_mtu() {
        let ns = namespace();
        let tap = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1400, 1000, 1001)
            .unwrap();
        assert_eq!(tap.commit(), "tap0_urunc");

        let link = ns.link("tap0_urunc").unwrap();
        assert!(link.tap);
        assert_eq!(link.owner, Some(1000));
        assert_eq!(link.group, Some(1001));
        assert_eq!(link.mtu, 1400);
    }

    #[test]
    fn uncommitted_tap_is_removed_on_drop() {
        let ns = namespace();
        let tap = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1500, 0, 0)
            .unwrap();
        drop(tap);
        assert!(ns.link("tap0_urunc").is_none());
    }

    #[test]
    fn ownership_failure_removes_the_device() {
        let ns = namespace();
        ns.fail_on(FailPoint::SetOwner);
        let err = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1500, 1000, 1000)
            .unwrap_err();
        assert!(matches!(err, NetworkError::OwnershipSetFailed { kind: "owner uid", id: 1000, .. }));
        assert!(ns.tap_names().is_empty());
        assert!(ns.link("tap0_urunc").is_none());
    }

    #[test]
    fn name_is_reusable_after_ownership_failure() {
        let ns = namespace();
        ns.fail_on(FailPoint::SetOwner);
        assert!(TapDeviceManager::new(&ns).create_tap("tap0_urunc", 1500, 0, 0).is_err());

        // The failed attempt must not leave a busy device holding the name.
        let retry = MemoryNamespace::snapshot(&ns).unwrap();
        let tap = TapDeviceManager::new(&retry)
            .create_tap("tap0_urunc", 1500, 0, 0)
            .unwrap();
        assert_eq!(tap.commit(), "tap0_urunc");
    }

    #[test]
    fn group_failure_is_reported_as_ownership_error() {
        let ns = namespace();
        ns.fail_on(FailPoint::SetGroup);
        let err = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1500, 0, 42)
            .unwrap_err();
        assert!(matches!(err, NetworkError::OwnershipSetFailed { kind: "group gid", id: 42, .. }));
        assert!(ns.tap_names().is_empty());
    }

    #[test]
    fn mtu_failure_removes_the_device() {
        let ns = namespace();
        ns.fail_on(FailPoint::SetMtu);
        let err = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 9000, 0, 0)
            .unwrap_err();
        assert!(matches!(err, NetworkError::MtuSetFailed { mtu: 9000, .. }));
        assert!(err.to_string().contains("failed to set tap device tap0_urunc MTU to 9000"));
        assert!(ns.tap_names().is_empty());
    }

    #[test]
    fn creation_failure_is_reported() {
        let ns = namespace();
        ns.fail_on(FailPoint::AddTap);
        let err = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1500, 0, 0)
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to create tap device tap0_urunc"));
    }

    #[test]
    fn existing_interface_is_not_reused() {
        let ns = namespace();
        let _ = ns.add_tap("tap0_urunc").unwrap();
        let err = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1500, 0, 0)
            .unwrap_err();
        assert!(matches!(err, NetworkError::TapCreationFailed { .. }));
        assert!(ns.link("tap0_urunc").is_some(), "pre-existing device must survive");
    }

    #[test]
    fn address_and_link_state_are_applied() {
        let ns = namespace();
        let tap = TapDeviceManager::new(&ns)
            .create_tap("tap0_urunc", 1500, 0, 0)
            .unwrap();
        tap.assign_address(Ipv4Addr::new(172, 16, 1, 2), 24).unwrap();
        tap.set_up().unwrap();
        let _ = tap.commit();

        let link = ns.link("tap0_urunc").unwrap();
        assert!(link.up);
        assert_eq!(link.addresses.len(), 1);
    }
}
