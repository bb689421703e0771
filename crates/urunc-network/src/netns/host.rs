//! [`NetNamespace`] backed by the namespace of the calling process.

#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::PathBuf;

use nix::sys::socket::{AddressFamily, SockFlag, SockType, SockaddrLike, SockaddrStorage, socket};

use super::ioctl::{self, TAP_FLAGS, TUN_CLONE_DEVICE};
use super::{LinkAddress, NetNamespace, route, tc};

/// Symlink naming the network namespace of the calling process.
const NETNS_SELF: &str = "/proc/self/ns/net";

/// The network namespace the process currently runs in.
///
/// Interfaces and addresses are read through `if_nameindex(3)` and
/// `getifaddrs(3)`, tap devices and link attributes are configured with
/// ioctls, and TC state is programmed through iproute2's `tc`.
#[derive(Debug, Clone, Default)]
pub struct HostNamespace {
    tc_binary: Option<PathBuf>,
}

impl HostNamespace {
    /// Operates on the current namespace, locating `tc` on `PATH` when needed.
    #[must_use]
    pub const fn new() -> Self {
        Self { tc_binary: None }
    }

    /// Uses an explicit `tc` binary instead of searching `PATH`.
    #[must_use]
    pub fn with_tc_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.tc_binary = Some(path.into());
        self
    }

    fn tc(&self, args: &[&str]) -> io::Result<()> {
        let binary = match &self.tc_binary {
            Some(path) => path.clone(),
            None => tc::locate()?,
        };
        tc::run(&binary, args)
    }
}

fn control_socket() -> io::Result<OwnedFd> {
    socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_CLOEXEC,
        None,
    )
    .map_err(io::Error::from)
}

fn open_tun() -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(TUN_CLONE_DEVICE)
}

/// Attaches `file` to the tap device `name`, creating it if absent.
fn attach_tap(file: &File, name: &str) -> io::Result<()> {
    let mut req = ioctl::ifreq_for(name)?;
    req.ifr_ifru.ifru_flags = TAP_FLAGS;
    // SAFETY: `req` is a valid ifreq naming the device and lives across the call.
    let _ = unsafe { ioctl::tun_set_iff(file.as_raw_fd(), &mut req) }?;
    Ok(())
}

fn ip_of(addr: &SockaddrStorage) -> Option<IpAddr> {
    match addr.family()? {
        AddressFamily::Inet => addr
            .as_sockaddr_in()
            .map(|sin| IpAddr::V4(Ipv4Addr::from(sin.ip()))),
        AddressFamily::Inet6 => addr
            .as_sockaddr_in6()
            .map(|sin6| IpAddr::V6(Ipv6Addr::from(sin6.ip()))),
        _ => None,
    }
}

impl NetNamespace for HostNamespace {
    type TapQueue = File;

    fn link_names(&self) -> io::Result<Vec<String>> {
        let interfaces = nix::net::if_::if_nameindex()?;
        Ok(interfaces
            .iter()
            .map(|iface| iface.name().to_string_lossy().into_owned())
            .collect())
    }

    fn link_addresses(&self, link: &str) -> io::Result<Vec<LinkAddress>> {
        let addresses = nix::ifaddrs::getifaddrs()?;
        Ok(addresses
            .filter(|ifa| ifa.interface_name == link)
            .filter_map(|ifa| {
                let address = ifa.address.as_ref().and_then(ip_of)?;
                let netmask = ifa.netmask.as_ref().and_then(ip_of);
                Some(LinkAddress { address, netmask })
            })
            .collect())
    }

    fn link_mtu(&self, link: &str) -> io::Result<u32> {
        let sock = control_socket()?;
        let mut req = ioctl::ifreq_for(link)?;
        // SAFETY: `req` names the interface and lives across the call.
        let _ = unsafe { ioctl::get_mtu(sock.as_raw_fd(), &mut req) }?;
        // SAFETY: SIOCGIFMTU fills the `ifru_mtu` member.
        let mtu = unsafe { req.ifr_ifru.ifru_mtu };
        u32::try_from(mtu).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{link} reports MTU {mtu}"))
        })
    }

    fn default_gateway(&self) -> io::Result<Option<Ipv4Addr>> {
        let table = std::fs::read_to_string(route::PROC_NET_ROUTE)?;
        Ok(route::parse_default_gateway(&table))
    }

    fn namespace_id(&self) -> io::Result<String> {
        let target = std::fs::read_link(NETNS_SELF)?;
        Ok(target.to_string_lossy().into_owned())
    }

    fn add_tap(&self, name: &str) -> io::Result<Vec<File>> {
        let queue = open_tun()?;
        attach_tap(&queue, name)?;
        // SAFETY: `queue` is an attached tun descriptor; the argument is a flag.
        let _ = unsafe { ioctl::tun_set_persist(queue.as_raw_fd(), 1) }?;
        tracing::debug!(tap = name, "tap device created");
        Ok(vec![queue])
    }

    fn set_tap_owner(&self, queue: &File, uid: u32) -> io::Result<()> {
        // SAFETY: `queue` is an attached tun descriptor; the argument is a uid.
        let _ = unsafe { ioctl::tun_set_owner(queue.as_raw_fd(), libc::c_ulong::from(uid)) }?;
        Ok(())
    }

    fn set_tap_group(&self, queue: &File, gid: u32) -> io::Result<()> {
        // SAFETY: `queue` is an attached tun descriptor; the argument is a gid.
        let _ = unsafe { ioctl::tun_set_group(queue.as_raw_fd(), libc::c_ulong::from(gid)) }?;
        Ok(())
    }

    fn delete_tap(&self, name: &str) -> io::Result<()> {
        let queue = open_tun()?;
        attach_tap(&queue, name)?;
        // SAFETY: `queue` is an attached tun descriptor; the argument is a flag.
        let _ = unsafe { ioctl::tun_set_persist(queue.as_raw_fd(), 0) }?;
        // Closing the last descriptor of a non-persistent tap removes it.
        drop(queue);
        tracing::debug!(tap = name, "tap device deleted");
        Ok(())
    }

    fn set_link_mtu(&self, link: &str, mtu: u32) -> io::Result<()> {
        let sock = control_socket()?;
        let mut req = ioctl::ifreq_for(link)?;
        req.ifr_ifru.ifru_mtu = libc::c_int::try_from(mtu).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("MTU {mtu} out of range"))
        })?;
        // SAFETY: `req` names the interface and carries the MTU.
        let _ = unsafe { ioctl::set_mtu(sock.as_raw_fd(), &req) }?;
        Ok(())
    }

    fn add_ipv4_address(&self, link: &str, address: Ipv4Addr, prefix_len: u8) -> io::Result<()> {
        let mask = urunc_common::types::prefix_to_mask(prefix_len).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("prefix /{prefix_len}"))
        })?;
        let sock = control_socket()?;

        let mut req = ioctl::ifreq_for(link)?;
        req.ifr_ifru.ifru_addr = ioctl::sockaddr_v4(address);
        // SAFETY: `req` names the interface and carries an AF_INET address.
        let _ = unsafe { ioctl::set_addr(sock.as_raw_fd(), &req) }?;

        let mut req = ioctl::ifreq_for(link)?;
        req.ifr_ifru.ifru_netmask = ioctl::sockaddr_v4(mask);
        // SAFETY: `req` names the interface and carries an AF_INET netmask.
        let _ = unsafe { ioctl::set_netmask(sock.as_raw_fd(), &req) }?;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_link_up(&self, link: &str) -> io::Result<()> {
        let sock = control_socket()?;
        let mut req = ioctl::ifreq_for(link)?;
        // SAFETY: `req` names the interface and lives across the call.
        let _ = unsafe { ioctl::get_flags(sock.as_raw_fd(), &mut req) }?;
        // SAFETY: SIOCGIFFLAGS fills the `ifru_flags` member.
        let flags = unsafe { req.ifr_ifru.ifru_flags };
        req.ifr_ifru.ifru_flags = flags | libc::IFF_UP as libc::c_short;
        // SAFETY: `req` names the interface and carries the new flags.
        let _ = unsafe { ioctl::set_flags(sock.as_raw_fd(), &req) }?;
        Ok(())
    }

    fn add_ingress_qdisc(&self, link: &str) -> io::Result<()> {
        self.tc(&tc::ingress_qdisc_add(link))
    }

    fn delete_ingress_qdisc(&self, link: &str) -> io::Result<()> {
        self.tc(&tc::ingress_qdisc_del(link))
    }

    fn add_redirect_filter(&self, from: &str, to: &str) -> io::Result<()> {
        self.tc(&tc::redirect_filter_add(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_listed() {
        let names = HostNamespace::new().link_names().unwrap();
        assert!(names.iter().any(|n| n == "lo"));
    }

    #[test]
    fn missing_interface_has_no_addresses() {
        let addrs = HostNamespace::new()
            .link_addresses("urunc-absent0")
            .unwrap();
        assert!(addrs.is_empty());
    }

    #[test]
    fn namespace_id_names_a_net_namespace() {
        let id = HostNamespace::new().namespace_id().unwrap();
        assert!(id.starts_with("net:["), "{id}");
    }

    #[test]
    fn oversized_interface_name_is_rejected_before_any_ioctl() {
        let err = HostNamespace::new()
            .set_link_mtu("an-interface-name-too-long", 1500)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
