//! Raw ioctl bindings for tun/tap and interface configuration.

#![allow(unsafe_code)]

use std::io;
use std::net::Ipv4Addr;

/// Clone device handing out tun/tap queues.
pub const TUN_CLONE_DEVICE: &str = "/dev/net/tun";

// linux/if_tun.h
const IFF_TAP: libc::c_int = 0x0002;
const IFF_NO_PI: libc::c_int = 0x1000;
const IFF_ONE_QUEUE: libc::c_int = 0x2000;
const IFF_VNET_HDR: libc::c_int = 0x4000;

/// Link-layer tap, one queue, no packet-info prefix, virtio-net headers.
#[allow(clippy::cast_possible_truncation)]
pub const TAP_FLAGS: libc::c_short = (IFF_TAP | IFF_NO_PI | IFF_ONE_QUEUE | IFF_VNET_HDR) as libc::c_short;

const TUN_IOC_MAGIC: u8 = b'T';

nix::ioctl_readwrite_bad!(
    tun_set_iff,
    nix::request_code_write!(TUN_IOC_MAGIC, 202, std::mem::size_of::<libc::c_int>()),
    libc::ifreq
);
nix::ioctl_write_int!(tun_set_persist, TUN_IOC_MAGIC, 203);
nix::ioctl_write_int!(tun_set_owner, TUN_IOC_MAGIC, 204);
nix::ioctl_write_int!(tun_set_group, TUN_IOC_MAGIC, 206);

nix::ioctl_readwrite_bad!(get_mtu, libc::SIOCGIFMTU, libc::ifreq);
nix::ioctl_write_ptr_bad!(set_mtu, libc::SIOCSIFMTU, libc::ifreq);
nix::ioctl_readwrite_bad!(get_flags, libc::SIOCGIFFLAGS, libc::ifreq);
nix::ioctl_write_ptr_bad!(set_flags, libc::SIOCSIFFLAGS, libc::ifreq);
nix::ioctl_write_ptr_bad!(set_addr, libc::SIOCSIFADDR, libc::ifreq);
nix::ioctl_write_ptr_bad!(set_netmask, libc::SIOCSIFNETMASK, libc::ifreq);

/// Builds a zeroed `ifreq` naming `name`.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] if `name` does not fit `IFNAMSIZ`
/// with its NUL terminator or contains a NUL byte.
#[allow(clippy::cast_possible_wrap)]
pub fn ifreq_for(name: &str) -> io::Result<libc::ifreq> {
    if name.is_empty() || name.len() >= libc::IFNAMSIZ || name.as_bytes().contains(&0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid interface name {name:?}"),
        ));
    }
    // SAFETY: `ifreq` is a plain C struct for which all-zero bytes are valid.
    let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in req.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *src as libc::c_char;
    }
    Ok(req)
}

/// Encodes an IPv4 address as the generic `sockaddr` carried by `ifreq`.
#[allow(clippy::cast_possible_truncation)]
pub fn sockaddr_v4(address: Ipv4Addr) -> libc::sockaddr {
    let sin = libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: 0,
        sin_addr: libc::in_addr {
            s_addr: u32::from_ne_bytes(address.octets()),
        },
        sin_zero: [0; 8],
    };
    // SAFETY: `sockaddr_in` and `sockaddr` are both 16 bytes on Linux and the
    // kernel reads the former through the latter.
    unsafe { std::mem::transmute::<libc::sockaddr_in, libc::sockaddr>(sin) }
}
