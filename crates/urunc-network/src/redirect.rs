//! Layer-2 frame redirection between two interfaces.
//!
//! Each direction is an ingress qdisc on the source plus a catch-all u32
//! classifier whose `mirred egress redirect` action steals every frame and
//! transmits it out of the target. Two directions make a transparent bridge.

use urunc_common::error::{NetworkError, Result};

use crate::netns::NetNamespace;

/// Installs TC redirects in a namespace.
#[derive(Debug)]
pub struct L2Redirector<'a, N> {
    ns: &'a N,
}

impl<'a, N: NetNamespace> L2Redirector<'a, N> {
    /// Programs TC state of `ns`.
    #[must_use]
    pub const fn new(ns: &'a N) -> Self {
        Self { ns }
    }

    /// Redirects every frame arriving on `source` to the egress of `target`.
    ///
    /// If the classifier cannot be attached the qdisc added for it is
    /// removed again.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::QdiscInstallFailed`] or
    /// [`NetworkError::FilterInstallFailed`].
    pub fn install_ingress_redirect(&self, source: &str, target: &str) -> Result<()> {
        self.ns
            .add_ingress_qdisc(source)
            .map_err(|e| NetworkError::QdiscInstallFailed {
                link: source.to_string(),
                source: e,
            })?;

        if let Err(e) = self.ns.add_redirect_filter(source, target) {
            self.remove_ingress(source);
            return Err(NetworkError::FilterInstallFailed {
                from: source.to_string(),
                to: target.to_string(),
                source: e,
            });
        }
        tracing::debug!(from = source, to = target, "ingress redirect installed");
        Ok(())
    }

    /// Redirects `a` to `b` and `b` to `a`.
    ///
    /// Either both directions are installed or neither is.
    ///
    /// # Errors
    ///
    /// Returns the error of whichever direction failed.
    pub fn install_bridge(&self, a: &str, b: &str) -> Result<()> {
        self.install_ingress_redirect(a, b)?;
        if let Err(e) = self.install_ingress_redirect(b, a) {
            self.remove_ingress(a);
            return Err(e);
        }
        tracing::info!(a, b, "bridged interfaces");
        Ok(())
    }

    fn remove_ingress(&self, link: &str) {
        if let Err(e) = self.ns.delete_ingress_qdisc(link) {
            tracing::warn!(link, error = %e, "failed to remove ingress qdisc");
        }
    }
}
