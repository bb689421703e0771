//! Kernel boundary of the network namespace.
//!
//! [`NetNamespace`] lists every kernel operation the managers rely on.
//! [`HostNamespace`] performs them against the namespace of the calling
//! process; [`MemoryNamespace`] keeps the same state in memory for dry runs
//! and tests.

#[cfg(target_os = "linux")]
mod host;
#[cfg(target_os = "linux")]
mod ioctl;
mod memory;
pub mod route;
pub mod tc;

use std::io;
use std::net::{IpAddr, Ipv4Addr};

#[cfg(target_os = "linux")]
pub use host::HostNamespace;
pub use memory::{FailPoint, MemoryLink, MemoryNamespace, MemoryQueue};

/// One address configured on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkAddress {
    /// Interface address.
    pub address: IpAddr,
    /// Netmask of the address, if the kernel reported one.
    pub netmask: Option<IpAddr>,
}

impl LinkAddress {
    /// Builds an IPv4 address entry from a prefix length.
    #[must_use]
    pub fn ipv4(address: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            address: IpAddr::V4(address),
            netmask: urunc_common::types::prefix_to_mask(prefix_len).map(IpAddr::V4),
        }
    }
}

/// Operations on the interfaces, addresses, routes, and TC state of one
/// network namespace.
///
/// All calls are synchronous. Errors are the kernel's own; callers attach the
/// intent of the step that failed.
pub trait NetNamespace {
    /// Open queue of a tap device, released when dropped.
    type TapQueue;

    /// Names of all interfaces in the namespace.
    fn link_names(&self) -> io::Result<Vec<String>>;

    /// Addresses configured on `link`, in kernel order.
    fn link_addresses(&self, link: &str) -> io::Result<Vec<LinkAddress>>;

    /// Current MTU of `link`.
    fn link_mtu(&self, link: &str) -> io::Result<u32>;

    /// Gateway of the IPv4 default route, if any.
    fn default_gateway(&self) -> io::Result<Option<Ipv4Addr>>;

    /// Stable identifier of the namespace, shared by every process inside it.
    fn namespace_id(&self) -> io::Result<String>;

    /// Creates a persistent single-queue tap device and returns its queues.
    fn add_tap(&self, name: &str) -> io::Result<Vec<Self::TapQueue>>;

    /// Assigns the owning uid of a tap queue.
    fn set_tap_owner(&self, queue: &Self::TapQueue, uid: u32) -> io::Result<()>;

    /// Assigns the owning gid of a tap queue.
    fn set_tap_group(&self, queue: &Self::TapQueue, gid: u32) -> io::Result<()>;

    /// Removes a persistent tap device.
    fn delete_tap(&self, name: &str) -> io::Result<()>;

    /// Sets the MTU of `link`.
    fn set_link_mtu(&self, link: &str, mtu: u32) -> io::Result<()>;

    /// Adds an IPv4 address with the given prefix length to `link`.
    fn add_ipv4_address(&self, link: &str, address: Ipv4Addr, prefix_len: u8) -> io::Result<()>;

    /// Brings `link` administratively up.
    fn set_link_up(&self, link: &str) -> io::Result<()>;

    /// Attaches the ingress queueing discipline to `link`.
    fn add_ingress_qdisc(&self, link: &str) -> io::Result<()>;

    /// Detaches the ingress queueing discipline, and its filters, from `link`.
    fn delete_ingress_qdisc(&self, link: &str) -> io::Result<()>;

    /// Redirects every frame entering `from` to the egress of `to`.
    ///
    /// Requires the ingress qdisc on `from`.
    fn add_redirect_filter(&self, from: &str, to: &str) -> io::Result<()>;
}
