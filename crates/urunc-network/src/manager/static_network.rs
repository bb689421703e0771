use urunc_common::config::NetworkConfig;
use urunc_common::error::Result;
use urunc_common::types::UnikernelNetworkInfo;

use crate::inspector::InterfaceInspector;
use crate::netns::NetNamespace;

/// One guest per namespace, attached to the primary interface itself.
///
/// Creates no tap device and no TC state.
#[derive(Debug)]
pub struct StaticNetwork<N> {
    config: NetworkConfig,
    ns: N,
}

impl<N: NetNamespace> StaticNetwork<N> {
    /// Manager for `ns` with `config`.
    #[must_use]
    pub const fn new(config: NetworkConfig, ns: N) -> Self {
        Self { config, ns }
    }

    pub(crate) fn namespace(&self) -> &N {
        &self.ns
    }

    /// Discovers the primary interface and describes it as the guest device.
    ///
    /// # Errors
    ///
    /// Returns the discovery error if the interface is absent or incomplete.
    pub fn setup(&self) -> Result<UnikernelNetworkInfo> {
        let primary = self.config.primary_interface.as_str();
        let eth_device = InterfaceInspector::new(&self.ns).discover(primary)?;

        tracing::info!(interface = primary, ip = %eth_device.ip, "static network ready");
        Ok(UnikernelNetworkInfo {
            tap_device: eth_device.interface.clone(),
            eth_device,
        })
    }
}
