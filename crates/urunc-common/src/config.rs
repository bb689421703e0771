//! Configuration model for the network managers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INTERFACE, DEFAULT_LOCK_DIR, DEFAULT_TAP_PREFIX_LEN, DEFAULT_TAP_TEMPLATE,
    DYNAMIC_TAP_IP_TEMPLATE, MAX_IFNAME_LEN, TAP_MARKER, TEMPLATE_PLACEHOLDER,
};
use crate::error::{NetworkError, Result};

/// Parameters shared by every network manager.
///
/// Passed explicitly at manager construction so that alternate namespaces
/// and templates need no process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface provisioned by the container network plugin.
    pub primary_interface: String,
    /// Tap naming template; `X` is replaced by the ordinal.
    pub tap_name_template: String,
    /// Substring that identifies tap devices when counting them.
    pub tap_marker: String,
    /// Tap address template; `X` is replaced by the ordinal plus one.
    pub tap_ip_template: String,
    /// Prefix length of the tap subnet.
    pub tap_prefix_len: u8,
    /// Tap MTU. `None` inherits the primary interface MTU.
    pub mtu: Option<u32>,
    /// Owner uid of the tap queues.
    pub owner_uid: u32,
    /// Owner gid of the tap queues.
    pub owner_gid: u32,
    /// Directory of the per-namespace lock files. `None` disables locking.
    pub lock_dir: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            primary_interface: DEFAULT_INTERFACE.to_string(),
            tap_name_template: DEFAULT_TAP_TEMPLATE.to_string(),
            tap_marker: TAP_MARKER.to_string(),
            tap_ip_template: DYNAMIC_TAP_IP_TEMPLATE.to_string(),
            tap_prefix_len: DEFAULT_TAP_PREFIX_LEN,
            mtu: None,
            owner_uid: 0,
            owner_gid: 0,
            lock_dir: Some(PathBuf::from(DEFAULT_LOCK_DIR)),
        }
    }
}

impl NetworkConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| NetworkError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the templates can produce usable names and addresses.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(NetworkError::Config { message });

        if self.primary_interface.is_empty() || self.primary_interface.len() > MAX_IFNAME_LEN {
            return invalid(format!(
                "primary interface {:?} is not a valid interface name",
                self.primary_interface
            ));
        }
        if !self.tap_name_template.contains(TEMPLATE_PLACEHOLDER) {
            return invalid(format!(
                "tap name template {:?} lacks the {TEMPLATE_PLACEHOLDER} placeholder",
                self.tap_name_template
            ));
        }
        if !self.tap_ip_template.contains(TEMPLATE_PLACEHOLDER) {
            return invalid(format!(
                "tap address template {:?} lacks the {TEMPLATE_PLACEHOLDER} placeholder",
                self.tap_ip_template
            ));
        }
        if self.tap_marker.is_empty() {
            return invalid("tap marker must not be empty".into());
        }
        if !self.tap_name_template.contains(&self.tap_marker) {
            return invalid(format!(
                "tap name template {:?} does not contain marker {:?}; created taps would not be counted",
                self.tap_name_template, self.tap_marker
            ));
        }
        if self.tap_prefix_len > 32 {
            return invalid(format!("tap prefix length /{} exceeds 32", self.tap_prefix_len));
        }
        if self.mtu == Some(0) {
            return invalid("tap MTU must be positive".into());
        }
        Ok(())
    }
}
