use urunc_common::config::NetworkConfig;
use urunc_common::error::{NetworkError, Result};
use urunc_common::types::{TapIdentity, UnikernelNetworkInfo};

use crate::allocator::TapIndexAllocator;
use crate::inspector::InterfaceInspector;
use crate::lock::NamespaceLock;
use crate::netns::NetNamespace;
use crate::redirect::L2Redirector;
use crate::tap::TapDeviceManager;

/// Several guests per namespace, each with its own tap device.
///
/// The first tap device in a namespace is bridged to the primary interface.
/// Later ones are created and addressed but not bridged, so only the first
/// guest is reachable through the primary interface.
#[derive(Debug)]
pub struct DynamicNetwork<N> {
    config: NetworkConfig,
    ns: N,
}

impl<N: NetNamespace> DynamicNetwork<N> {
    /// Manager for `ns` with `config`.
    #[must_use]
    pub const fn new(config: NetworkConfig, ns: N) -> Self {
        Self { config, ns }
    }

    pub(crate) fn namespace(&self) -> &N {
        &self.ns
    }

    /// Creates the next tap device and, for the first one, bridges it to the
    /// primary interface.
    ///
    /// When `lock_dir` is configured the whole sequence runs under the
    /// namespace lock. A failure after the tap device was created removes it.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that failed.
    pub fn setup(&self) -> Result<UnikernelNetworkInfo> {
        let _lock = self.lock()?;

        let primary = self.config.primary_interface.as_str();
        let eth_device = InterfaceInspector::new(&self.ns).discover(primary)?;

        let ordinal =
            TapIndexAllocator::new(&self.ns, &self.config.tap_marker).count_tap_devices()?;
        let identity = TapIdentity::derive(ordinal, &self.config)?;
        let mtu = match self.config.mtu {
            Some(mtu) => mtu,
            None => self
                .ns
                .link_mtu(primary)
                .map_err(|source| NetworkError::MtuQueryFailed {
                    name: primary.to_string(),
                    source,
                })?,
        };

        tracing::info!(
            tap = %identity.name,
            ordinal,
            address = %identity.cidr(),
            mtu,
            "creating guest tap device"
        );
        let tap = TapDeviceManager::new(&self.ns).create_tap(
            &identity.name,
            mtu,
            self.config.owner_uid,
            self.config.owner_gid,
        )?;
        tap.assign_address(identity.address, identity.prefix_len)?;
        tap.set_up()?;

        if ordinal == 0 {
            L2Redirector::new(&self.ns).install_bridge(primary, tap.name())?;
        } else {
            tracing::warn!(
                tap = %identity.name,
                ordinal,
                "tap device is not bridged to {primary}; only the first guest is reachable"
            );
        }

        Ok(UnikernelNetworkInfo {
            tap_device: tap.commit(),
            eth_device,
        })
    }

    fn lock(&self) -> Result<Option<NamespaceLock>> {
        let Some(dir) = &self.config.lock_dir else {
            return Ok(None);
        };
        let id = self.ns.namespace_id().map_err(|source| NetworkError::Lock {
            path: dir.clone(),
            source,
        })?;
        NamespaceLock::acquire(dir, &id).map(Some)
    }
}
