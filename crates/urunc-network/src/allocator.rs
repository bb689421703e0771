//! Ordinal allocation for new tap devices.
//!
//! The ordinal is recounted from the live interface list on every call, so
//! separate processes setting up guests in one namespace agree on it without
//! shared state. Two concurrent setups can observe the same count; callers
//! serialize through [`crate::lock::NamespaceLock`].

use urunc_common::error::{NetworkError, Result};

use crate::netns::NetNamespace;

/// Counts the tap devices already present in a namespace.
#[derive(Debug)]
pub struct TapIndexAllocator<'a, N> {
    ns: &'a N,
    marker: &'a str,
}

impl<'a, N: NetNamespace> TapIndexAllocator<'a, N> {
    /// Counts interfaces of `ns` whose name contains `marker`.
    #[must_use]
    pub const fn new(ns: &'a N, marker: &'a str) -> Self {
        Self { ns, marker }
    }

    /// Number of tap devices in the namespace, which is also the ordinal of
    /// the next one.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::LinkEnumerationFailed`] if interfaces cannot
    /// be listed.
    pub fn count_tap_devices(&self) -> Result<usize> {
        let links = self
            .ns
            .link_names()
            .map_err(|source| NetworkError::LinkEnumerationFailed { source })?;
        let count = links.iter().filter(|name| name.contains(self.marker)).count();
        tracing::debug!(marker = self.marker, count, "counted tap devices");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netns::{FailPoint, MemoryNamespace};

    #[test]
    fn count_returns_zero_without_taps() {
        let ns = MemoryNamespace::new("net:[1]")
            .with_link("lo", 65536)
            .with_link("eth0", 1500);
        assert_eq!(TapIndexAllocator::new(&ns, "tap").count_tap_devices().unwrap(), 0);
    }

    #[test]
    fn count_follows_created_taps() {
        let ns = MemoryNamespace::new("net:[1]").with_link("eth0", 1500);
        let allocator = TapIndexAllocator::new(&ns, "tap");

        let _ = ns.add_tap("tap0_urunc").unwrap();
        assert_eq!(allocator.count_tap_devices().unwrap(), 1);

        let _ = ns.add_tap("tap1_urunc").unwrap();
        assert_eq!(allocator.count_tap_devices().unwrap(), 2);
    }

    #[test]
    fn any_name_containing_marker_counts() {
        let ns = MemoryNamespace::new("net:[1]")
            .with_link("eth0", 1500)
            .with_link("tap-foreign", 1500)
            .with_link("mytap", 1500);
        assert_eq!(TapIndexAllocator::new(&ns, "tap").count_tap_devices().unwrap(), 2);
    }

    #[test]
    fn enumeration_failure_is_propagated() {
        let ns = MemoryNamespace::new("net:[1]");
        ns.fail_on(FailPoint::ListLinks);
        let err = TapIndexAllocator::new(&ns, "tap").count_tap_devices().unwrap_err();
        assert!(matches!(err, NetworkError::LinkEnumerationFailed { .. }));
    }
}
