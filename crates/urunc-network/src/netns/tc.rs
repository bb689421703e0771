//! Traffic-control commands, issued through iproute2's `tc`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Handle of the ingress qdisc, as `tc` spells it.
pub const INGRESS_PARENT: &str = "ffff:";

/// Arguments attaching the ingress qdisc to `link`.
#[must_use]
pub fn ingress_qdisc_add(link: &str) -> [&str; 5] {
    ["qdisc", "add", "dev", link, "ingress"]
}

/// Arguments removing the ingress qdisc, and every filter under it, from `link`.
#[must_use]
pub fn ingress_qdisc_del(link: &str) -> [&str; 5] {
    ["qdisc", "del", "dev", link, "ingress"]
}

/// Arguments of a catch-all u32 filter on `from`'s ingress that redirects
/// every frame, whatever its protocol, to `to`'s egress.
///
/// `mirred` redirects default to the `stolen` verdict, so matched frames
/// never continue through `from`'s own stack.
#[must_use]
pub fn redirect_filter_add<'a>(from: &'a str, to: &'a str) -> [&'a str; 19] {
    [
        "filter",
        "add",
        "dev",
        from,
        "parent",
        INGRESS_PARENT,
        "protocol",
        "all",
        "u32",
        "match",
        "u32",
        "0",
        "0",
        "action",
        "mirred",
        "egress",
        "redirect",
        "dev",
        to,
    ]
}

/// Locates the `tc` binary on `PATH`.
///
/// # Errors
///
/// Returns [`io::ErrorKind::NotFound`] if iproute2 is not installed.
pub fn locate() -> io::Result<PathBuf> {
    which::which("tc").map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("tc: {e}")))
}

/// Runs `tc` with `args`, turning a non-zero exit into an error carrying stderr.
///
/// # Errors
///
/// Returns an error if `tc` cannot be spawned or exits unsuccessfully.
pub fn run(binary: &Path, args: &[&str]) -> io::Result<()> {
    tracing::debug!(args = %args.join(" "), "running tc");
    let output = Command::new(binary).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::other(format!(
            "tc {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingress_qdisc_targets_link() {
        assert_eq!(ingress_qdisc_add("eth0").join(" "), "qdisc add dev eth0 ingress");
        assert_eq!(ingress_qdisc_del("eth0").join(" "), "qdisc del dev eth0 ingress");
    }

    #[test]
    fn redirect_filter_matches_everything_and_redirects_to_egress() {
        let args = redirect_filter_add("eth0", "tap0_urunc").join(" ");
        assert_eq!(
            args,
            "filter add dev eth0 parent ffff: protocol all u32 match u32 0 0 \
             action mirred egress redirect dev tap0_urunc"
        );
    }

    #[test]
    fn failing_command_reports_arguments() {
        let err = run(Path::new("false"), &["qdisc", "show"]).unwrap_err();
        assert!(err.to_string().contains("tc qdisc show failed"));
    }
}
