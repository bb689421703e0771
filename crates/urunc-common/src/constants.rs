//! Default device names, templates, and paths.

/// Interface provisioned by the container network plugin inside the namespace.
pub const DEFAULT_INTERFACE: &str = "eth0";

/// Placeholder substituted by the tap ordinal in name and address templates.
pub const TEMPLATE_PLACEHOLDER: char = 'X';

/// Naming template for tap devices created by the dynamic policy.
pub const DEFAULT_TAP_TEMPLATE: &str = "tapX_urunc";

/// Substring identifying tap devices when counting existing ones.
pub const TAP_MARKER: &str = "tap";

/// Address template for tap devices; the placeholder is the ordinal plus one.
pub const DYNAMIC_TAP_IP_TEMPLATE: &str = "172.16.X.2";

/// Prefix length of the per-tap subnet.
pub const DEFAULT_TAP_PREFIX_LEN: u8 = 24;

/// Directory holding the per-namespace setup lock files.
pub const DEFAULT_LOCK_DIR: &str = "/run/urunc/netns";

/// Maximum interface name length, excluding the trailing NUL (`IFNAMSIZ - 1`).
pub const MAX_IFNAME_LEN: usize = 15;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "urunc-net";
