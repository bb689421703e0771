//! In-memory [`NetNamespace`] for dry runs and tests.
//!
//! Mirrors the kernel behaviour the managers depend on: duplicate devices
//! and qdiscs are rejected, filters need an ingress qdisc, deleting a qdisc
//! drops its filters, and a tap stays busy while one of its queues is open.
//! Individual operations can be made to fail.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{LinkAddress, NetNamespace};

/// MTU given to links created without an explicit one.
const DEFAULT_MTU: u32 = 1500;

/// Operation forced to fail with a permission error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Listing interface names.
    ListLinks,
    /// Reading the routing table.
    Routes,
    /// Creating a tap device.
    AddTap,
    /// Setting a tap queue owner.
    SetOwner,
    /// Setting a tap queue group.
    SetGroup,
    /// Setting any link MTU.
    SetMtu,
    /// Adding any address.
    AddAddress,
    /// Bringing any link up.
    LinkUp,
    /// Adding the ingress qdisc on the named link.
    AddQdisc(String),
    /// Adding a redirect filter on the named source link.
    AddFilter(String),
}

/// State of one in-memory interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLink {
    /// Configured addresses, in insertion order.
    pub addresses: Vec<LinkAddress>,
    /// Link MTU.
    pub mtu: u32,
    /// Administrative state.
    pub up: bool,
    /// Whether the link was created as a tap device.
    pub tap: bool,
    /// Owner uid of the tap queues.
    pub owner: Option<u32>,
    /// Owner gid of the tap queues.
    pub group: Option<u32>,
    /// Whether the ingress qdisc is attached.
    pub ingress_qdisc: bool,
    /// Targets of the redirect filters attached under the ingress qdisc.
    pub redirects: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    id: String,
    links: BTreeMap<String, MemoryLink>,
    gateway: Option<Ipv4Addr>,
    failures: HashSet<FailPoint>,
    open_queues: BTreeMap<String, usize>,
}

/// Network namespace held entirely in memory.
///
/// Clones share state, so a test can keep a handle while a manager owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryNamespace {
    state: Arc<Mutex<State>>,
}

/// Open queue of an in-memory tap device.
///
/// Like a tun descriptor, the device cannot be deleted until every queue is
/// dropped.
#[derive(Debug)]
pub struct MemoryQueue {
    name: String,
    state: Arc<Mutex<State>>,
}

impl MemoryQueue {
    /// Name of the tap device the queue is attached to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MemoryQueue {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(open) = state.open_queues.get_mut(&self.name) {
            *open -= 1;
            if *open == 0 {
                let _ = state.open_queues.remove(&self.name);
            }
        }
    }
}

fn injected(point: &FailPoint) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("injected failure: {point:?}"),
    )
}

fn no_such_device(link: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{link}: no such device"))
}

impl MemoryNamespace {
    /// Creates an empty namespace with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let ns = Self::default();
        ns.state().id = id.into();
        ns
    }

    /// Copies the interfaces, addresses, MTUs, and default gateway of
    /// `source` without modifying it.
    ///
    /// # Errors
    ///
    /// Returns the first error reported while reading `source`.
    pub fn snapshot<N: NetNamespace>(source: &N) -> io::Result<Self> {
        let ns = Self::new(source.namespace_id()?);
        for name in source.link_names()? {
            let link = MemoryLink {
                addresses: source.link_addresses(&name)?,
                mtu: source.link_mtu(&name)?,
                up: true,
                ..MemoryLink::default()
            };
            let _ = ns.state().links.insert(name, link);
        }
        ns.state().gateway = source.default_gateway()?;
        Ok(ns)
    }

    /// Adds a plain link.
    #[must_use]
    pub fn with_link(self, name: &str, mtu: u32) -> Self {
        let link = MemoryLink {
            mtu,
            up: true,
            ..MemoryLink::default()
        };
        let _ = self.state().links.insert(name.to_string(), link);
        self
    }

    /// Adds an address to an existing link; ignored if the link is absent.
    #[must_use]
    pub fn with_address(self, link: &str, address: LinkAddress) -> Self {
        if let Some(entry) = self.state().links.get_mut(link) {
            entry.addresses.push(address);
        }
        self
    }

    /// Adds an IPv4 address with its prefix length to an existing link.
    #[must_use]
    pub fn with_ipv4(self, link: &str, address: Ipv4Addr, prefix_len: u8) -> Self {
        self.with_address(link, LinkAddress::ipv4(address, prefix_len))
    }

    /// Sets the gateway of the default route.
    #[must_use]
    pub fn with_gateway(self, gateway: Ipv4Addr) -> Self {
        self.state().gateway = Some(gateway);
        self
    }

    /// Makes every later call of the given operation fail.
    pub fn fail_on(&self, point: FailPoint) {
        let _ = self.state().failures.insert(point);
    }

    /// Returns a copy of the named link.
    #[must_use]
    pub fn link(&self, name: &str) -> Option<MemoryLink> {
        self.state().links.get(name).cloned()
    }

    /// Names of the links created as tap devices.
    #[must_use]
    pub fn tap_names(&self) -> Vec<String> {
        self.state()
            .links
            .iter()
            .filter(|(_, link)| link.tap)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(state: &State, point: &FailPoint) -> io::Result<()> {
        if state.failures.contains(point) {
            return Err(injected(point));
        }
        Ok(())
    }

    fn with_link_mut<T>(
        &self,
        link: &str,
        point: &FailPoint,
        f: impl FnOnce(&mut MemoryLink) -> io::Result<T>,
    ) -> io::Result<T> {
        let mut state = self.state();
        Self::check(&state, point)?;
        let entry = state.links.get_mut(link).ok_or_else(|| no_such_device(link))?;
        f(entry)
    }
}

impl NetNamespace for MemoryNamespace {
    type TapQueue = MemoryQueue;

    fn link_names(&self) -> io::Result<Vec<String>> {
        let state = self.state();
        Self::check(&state, &FailPoint::ListLinks)?;
        Ok(state.links.keys().cloned().collect())
    }

    fn link_addresses(&self, link: &str) -> io::Result<Vec<LinkAddress>> {
        Ok(self
            .state()
            .links
            .get(link)
            .map(|entry| entry.addresses.clone())
            .unwrap_or_default())
    }

    fn link_mtu(&self, link: &str) -> io::Result<u32> {
        self.state()
            .links
            .get(link)
            .map(|entry| entry.mtu)
            .ok_or_else(|| no_such_device(link))
    }

    fn default_gateway(&self) -> io::Result<Option<Ipv4Addr>> {
        let state = self.state();
        Self::check(&state, &FailPoint::Routes)?;
        Ok(state.gateway)
    }

    fn namespace_id(&self) -> io::Result<String> {
        Ok(self.state().id.clone())
    }

    fn add_tap(&self, name: &str) -> io::Result<Vec<MemoryQueue>> {
        let mut state = self.state();
        Self::check(&state, &FailPoint::AddTap)?;
        if state.links.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{name}: device or resource busy"),
            ));
        }
        let link = MemoryLink {
            mtu: DEFAULT_MTU,
            tap: true,
            ..MemoryLink::default()
        };
        let _ = state.links.insert(name.to_string(), link);
        let _ = state.open_queues.insert(name.to_string(), 1);
        Ok(vec![MemoryQueue {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }])
    }

    fn set_tap_owner(&self, queue: &MemoryQueue, uid: u32) -> io::Result<()> {
        self.with_link_mut(&queue.name, &FailPoint::SetOwner, |link| {
            link.owner = Some(uid);
            Ok(())
        })
    }

    fn set_tap_group(&self, queue: &MemoryQueue, gid: u32) -> io::Result<()> {
        self.with_link_mut(&queue.name, &FailPoint::SetGroup, |link| {
            link.group = Some(gid);
            Ok(())
        })
    }

    fn delete_tap(&self, name: &str) -> io::Result<()> {
        let mut state = self.state();
        if state.open_queues.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::ResourceBusy,
                format!("{name}: device or resource busy"),
            ));
        }
        match state.links.get(name).map(|link| link.tap) {
            Some(true) => {
                let _ = state.links.remove(name);
                for other in state.links.values_mut() {
                    other.redirects.retain(|target| target != name);
                }
                Ok(())
            }
            Some(false) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name} is not a tap device"),
            )),
            None => Err(no_such_device(name)),
        }
    }

    fn set_link_mtu(&self, link: &str, mtu: u32) -> io::Result<()> {
        self.with_link_mut(link, &FailPoint::SetMtu, |entry| {
            entry.mtu = mtu;
            Ok(())
        })
    }

    fn add_ipv4_address(&self, link: &str, address: Ipv4Addr, prefix_len: u8) -> io::Result<()> {
        self.with_link_mut(link, &FailPoint::AddAddress, |entry| {
            let addr = LinkAddress::ipv4(address, prefix_len);
            if entry.addresses.contains(&addr) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{address}/{prefix_len}: file exists"),
                ));
            }
            entry.addresses.push(addr);
            Ok(())
        })
    }

    fn set_link_up(&self, link: &str) -> io::Result<()> {
        self.with_link_mut(link, &FailPoint::LinkUp, |entry| {
            entry.up = true;
            Ok(())
        })
    }

    fn add_ingress_qdisc(&self, link: &str) -> io::Result<()> {
        self.with_link_mut(link, &FailPoint::AddQdisc(link.to_string()), |entry| {
            if entry.ingress_qdisc {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "exclusivity flag on, cannot modify",
                ));
            }
            entry.ingress_qdisc = true;
            Ok(())
        })
    }

    fn delete_ingress_qdisc(&self, link: &str) -> io::Result<()> {
        let mut state = self.state();
        let entry = state.links.get_mut(link).ok_or_else(|| no_such_device(link))?;
        if !entry.ingress_qdisc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot find specified qdisc on specified device",
            ));
        }
        entry.ingress_qdisc = false;
        entry.redirects.clear();
        Ok(())
    }

    fn add_redirect_filter(&self, from: &str, to: &str) -> io::Result<()> {
        let mut state = self.state();
        Self::check(&state, &FailPoint::AddFilter(from.to_string()))?;
        if !state.links.contains_key(to) {
            return Err(no_such_device(to));
        }
        let entry = state.links.get_mut(from).ok_or_else(|| no_such_device(from))?;
        if !entry.ingress_qdisc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{from} has no ingress qdisc"),
            ));
        }
        entry.redirects.push(to.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use super::*;

    #[test]
    fn clones_share_state() {
        let ns = MemoryNamespace::new("net:[1]").with_link("eth0", 1500);
        let handle = ns.clone();
        let _ = ns.add_tap("tap0_urunc").unwrap();
        assert_eq!(handle.tap_names(), vec!["tap0_urunc".to_string()]);
    }

    #[test]
    fn duplicate_tap_is_rejected() {
        let ns = MemoryNamespace::new("net:[1]");
        let _ = ns.add_tap("tap0_urunc").unwrap();
        let err = ns.add_tap("tap0_urunc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn filter_requires_ingress_qdisc() {
        let ns = MemoryNamespace::new("net:[1]")
            .with_link("eth0", 1500)
            .with_link("tap0_urunc", 1500);
        assert!(ns.add_redirect_filter("eth0", "tap0_urunc").is_err());
        ns.add_ingress_qdisc("eth0").unwrap();
        ns.add_redirect_filter("eth0", "tap0_urunc").unwrap();
        assert_eq!(ns.link("eth0").unwrap().redirects, vec!["tap0_urunc".to_string()]);
    }

    #[test]
    fn deleting_qdisc_drops_filters() {
        let ns = MemoryNamespace::new("net:[1]")
            .with_link("eth0", 1500)
            .with_link("tap0_urunc", 1500);
        ns.add_ingress_qdisc("eth0").unwrap();
        ns.add_redirect_filter("eth0", "tap0_urunc").unwrap();
        ns.delete_ingress_qdisc("eth0").unwrap();
        let eth0 = ns.link("eth0").unwrap();
        assert!(!eth0.ingress_qdisc);
        assert!(eth0.redirects.is_empty());
    }

    #[test]
    fn only_taps_can_be_deleted() {
        let ns = MemoryNamespace::new("net:[1]").with_link("eth0", 1500);
        assert!(ns.delete_tap("eth0").is_err());
        assert!(ns.link("eth0").is_some());
    }

    #[test]
    fn tap_with_open_queue_cannot_be_deleted() {
        let ns = MemoryNamespace::new("net:[1]");
        let queues = ns.add_tap("tap0_urunc").unwrap();
        assert_eq!(queues[0].name(), "tap0_urunc");

        let err = ns.delete_tap("tap0_urunc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ResourceBusy);
        assert!(ns.link("tap0_urunc").is_some());

        drop(queues);
        ns.delete_tap("tap0_urunc").unwrap();
        assert!(ns.tap_names().is_empty());
    }

    #[test]
    fn injected_failure_is_permission_denied() {
        let ns = MemoryNamespace::new("net:[1]");
        ns.fail_on(FailPoint::AddTap);
        let err = ns.add_tap("tap0_urunc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(ns.tap_names().is_empty());
    }

    #[test]
    fn snapshot_copies_links_and_gateway() {
        let source = MemoryNamespace::new("net:[7]")
            .with_link("eth0", 1450)
            .with_ipv4("eth0", Ipv4Addr::new(10, 0, 0, 5), 24)
            .with_gateway(Ipv4Addr::new(10, 0, 0, 1));

        let copy = MemoryNamespace::snapshot(&source).unwrap();
        let _ = copy.add_tap("tap0_urunc").unwrap();

        assert_eq!(copy.namespace_id().unwrap(), "net:[7]");
        assert_eq!(copy.link_mtu("eth0").unwrap(), 1450);
        assert_eq!(
            copy.link_addresses("eth0").unwrap()[0].address,
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))
        );
        assert_eq!(copy.default_gateway().unwrap(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(source.tap_names().is_empty());
    }
}
