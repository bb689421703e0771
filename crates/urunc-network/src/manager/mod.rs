//! Network managers, one per deployment policy.
//!
//! A manager turns the namespace's primary interface into a
//! [`UnikernelNetworkInfo`] the VMM configuration is built from. `setup`
//! either returns a descriptor with every step applied or an error with no
//! device left behind by the failed call.

mod dynamic;
mod static_network;

pub use dynamic::DynamicNetwork;
pub use static_network::StaticNetwork;

use urunc_common::config::NetworkConfig;
use urunc_common::error::Result;
use urunc_common::types::{NetworkPolicy, UnikernelNetworkInfo};

use crate::netns::NetNamespace;

/// Manager selected by a [`NetworkPolicy`].
#[derive(Debug)]
pub enum NetworkManager<N> {
    /// The guest uses the primary interface directly.
    Static(StaticNetwork<N>),
    /// The guest gets its own tap device.
    Dynamic(DynamicNetwork<N>),
}

impl<N: NetNamespace> NetworkManager<N> {
    /// Selects the manager for the policy named `policy`.
    ///
    /// No kernel state is touched before the policy and configuration are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPolicy` for a name other than `static` or
    /// `dynamic`, or `Config` if `config` is invalid.
    pub fn new(policy: &str, config: NetworkConfig, ns: N) -> Result<Self> {
        let policy: NetworkPolicy = policy.parse()?;
        Self::from_policy(policy, config, ns)
    }

    /// Builds the manager for an already parsed policy.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `config` is invalid.
    pub fn from_policy(policy: NetworkPolicy, config: NetworkConfig, ns: N) -> Result<Self> {
        config.validate()?;
        Ok(match policy {
            NetworkPolicy::Static => Self::Static(StaticNetwork::new(config, ns)),
            NetworkPolicy::Dynamic => Self::Dynamic(DynamicNetwork::new(config, ns)),
        })
    }

    /// Policy this manager implements.
    #[must_use]
    pub const fn policy(&self) -> NetworkPolicy {
        match self {
            Self::Static(_) => NetworkPolicy::Static,
            Self::Dynamic(_) => NetworkPolicy::Dynamic,
        }
    }

    /// Namespace the manager operates on.
    #[must_use]
    pub fn namespace(&self) -> &N {
        match self {
            Self::Static(m) => m.namespace(),
            Self::Dynamic(m) => m.namespace(),
        }
    }

    /// Prepares networking for one guest.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that failed.
    pub fn setup(&self) -> Result<UnikernelNetworkInfo> {
        tracing::info!(policy = %self.policy(), "setting up guest network");
        match self {
            Self::Static(m) => m.setup(),
            Self::Dynamic(m) => m.setup(),
        }
    }
}
