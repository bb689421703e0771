//! Unified error types for the urunc network workspace.
//!
//! Every variant is terminal for the setup call that produced it. Kernel
//! failures are carried as [`std::io::Error`] sources so the caller sees both
//! the intent of the failed step and the kernel's own message.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The requested network policy has no manager.
    #[error("network manager {policy} not supported")]
    UnsupportedPolicy {
        /// Policy name as supplied by the caller.
        policy: String,
    },

    /// The namespace interfaces could not be listed.
    #[error("failed to list network interfaces: {source}")]
    LinkEnumerationFailed {
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// A required interface is absent from the namespace.
    #[error("{name} device not found")]
    InterfaceNotFound {
        /// Interface that was looked up.
        name: String,
    },

    /// The interface carries no usable IPv4 address.
    #[error("failed to find IPv4 address for {name:?}")]
    NoIpv4Address {
        /// Interface that was inspected.
        name: String,
    },

    /// The netmask of the selected address could not be determined.
    #[error("failed to find mask for {name:?}")]
    MaskNotFound {
        /// Interface that was inspected.
        name: String,
    },

    /// The default gateway of the namespace could not be resolved.
    #[error("failed to discover default gateway: {message}")]
    GatewayDiscoveryFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// The tap device could not be created.
    #[error("failed to create tap device {name}: {source}")]
    TapCreationFailed {
        /// Requested tap device name.
        name: String,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// Owner or group could not be assigned to a tap queue.
    #[error("failed to set tap {name} {kind} to {id}: {source}")]
    OwnershipSetFailed {
        /// Tap device name.
        name: String,
        /// Either `"owner uid"` or `"group gid"`.
        kind: &'static str,
        /// Requested uid or gid.
        id: u32,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The MTU of an existing interface could not be read.
    #[error("failed to read MTU of {name}: {source}")]
    MtuQueryFailed {
        /// Interface name.
        name: String,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The tap MTU could not be set.
    #[error("failed to set tap device {name} MTU to {mtu}: {source}")]
    MtuSetFailed {
        /// Tap device name.
        name: String,
        /// Requested MTU.
        mtu: u32,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The tap address could not be assigned.
    #[error("failed to add address {address} to {name}: {source}")]
    AddressSetFailed {
        /// Interface name.
        name: String,
        /// Address in CIDR notation.
        address: String,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The interface could not be brought up.
    #[error("failed to set {name} up: {source}")]
    LinkUpFailed {
        /// Interface name.
        name: String,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The ingress queueing discipline could not be attached.
    #[error("failed to add ingress qdisc to {link}: {source}")]
    QdiscInstallFailed {
        /// Interface the qdisc was meant for.
        link: String,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The redirect classifier could not be attached.
    #[error("failed to add redirect filter {from} -> {to}: {source}")]
    FilterInstallFailed {
        /// Interface whose ingress is redirected.
        from: String,
        /// Interface receiving the frames on egress.
        to: String,
        /// Underlying kernel error.
        source: std::io::Error,
    },

    /// The namespace setup lock could not be taken.
    #[error("failed to lock {path}: {source}")]
    Lock {
        /// Lock file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NetworkError>;
