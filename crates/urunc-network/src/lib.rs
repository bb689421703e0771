//! # urunc-network
//!
//! Network provisioning for unikernel guests running inside a VMM.
//!
//! A unikernel cannot attach to the namespace's veth endpoint directly. This
//! crate bridges that endpoint to a tap device the VMM can consume:
//! - **Inspection**: address, netmask, and gateway of the primary interface.
//! - **Allocation**: the ordinal of the next tap device, read from the
//!   live interface list.
//! - **Tap devices**: single-queue, vnet-header taps owned by the VMM user.
//! - **Redirects**: ingress qdisc plus a catch-all `mirred` filter moving
//!   raw frames between two interfaces.
//! - **Managers**: the `static` and `dynamic` policies built from the above.
//!
//! Every kernel call goes through [`netns::NetNamespace`]. Unsafe ioctls are
//! confined to `netns::ioctl` with `// SAFETY:` notes.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod allocator;
pub mod inspector;
pub mod lock;
pub mod manager;
pub mod netns;
pub mod redirect;
pub mod tap;

pub use manager::NetworkManager;
