//! End-to-end tests for guest network setup.
//!
//! These tests drive the full pipeline against an in-memory namespace:
//! 1. Select a manager from a policy name and configuration
//! 2. Discover the primary interface
//! 3. Allocate, create, and bridge tap devices
//! 4. Render the guest command line from the resulting descriptor

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::io::Write;
use std::net::Ipv4Addr;

use urunc_common::config::NetworkConfig;
use urunc_common::error::NetworkError;
use urunc_network::NetworkManager;
use urunc_network::netns::{FailPoint, MemoryNamespace};
use urunc_unikernel::{UnikernelParams, new_unikernel};

fn container_namespace() -> MemoryNamespace {
    MemoryNamespace::new("net:[4026532411]")
        .with_link("lo", 65536)
        .with_ipv4("lo", Ipv4Addr::LOCALHOST, 8)
        .with_link("eth0", 1500)
        .with_ipv4("eth0", Ipv4Addr::new(10, 0, 0, 5), 24)
        .with_gateway(Ipv4Addr::new(10, 0, 0, 1))
}

fn config(lock_dir: &std::path::Path) -> NetworkConfig {
    NetworkConfig {
        lock_dir: Some(lock_dir.to_path_buf()),
        ..NetworkConfig::default()
    }
}

// ── Dynamic policy ───────────────────────────────────────────────────

#[test]
fn pipeline_dynamic_setup_boots_mewz() {
    let locks = tempfile::tempdir().unwrap();
    let ns = container_namespace();
    let manager = NetworkManager::new("dynamic", config(locks.path()), ns.clone()).unwrap();

    let info = manager.setup().unwrap();
    assert_eq!(info.tap_device, "tap0_urunc");

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["tap_device"], "tap0_urunc");
    assert_eq!(json["eth_device"]["ip"], "10.0.0.5");
    assert_eq!(json["eth_device"]["default_gateway"], "10.0.0.1");
    assert_eq!(json["eth_device"]["mask"], "255.255.255.0");
    assert_eq!(json["eth_device"]["interface"], "eth0");

    let mut mewz = new_unikernel("mewz").unwrap();
    mewz.init(&UnikernelParams::from_network(&info, "")).unwrap();
    assert_eq!(mewz.command_string().unwrap(), "10.0.0.5/24 10.0.0.1 ");
}

#[test]
fn pipeline_two_guests_share_a_namespace() {
    let locks = tempfile::tempdir().unwrap();
    let ns = container_namespace();

    // Separate managers stand in for separate setup processes.
    let first = NetworkManager::new("dynamic", config(locks.path()), ns.clone())
        .unwrap()
        .setup()
        .unwrap();
    let second = NetworkManager::new("dynamic", config(locks.path()), ns.clone())
        .unwrap()
        .setup()
        .unwrap();

    assert_eq!(first.tap_device, "tap0_urunc");
    assert_eq!(second.tap_device, "tap1_urunc");
    assert_eq!(first.eth_device, second.eth_device);

    let mut taps = ns.tap_names();
    taps.sort();
    assert_eq!(taps, vec!["tap0_urunc", "tap1_urunc"]);
    assert!(ns.link("tap0_urunc").unwrap().ingress_qdisc);
    assert!(!ns.link("tap1_urunc").unwrap().ingress_qdisc);
}

#[test]
fn pipeline_failed_setup_leaves_namespace_unchanged() {
    let locks = tempfile::tempdir().unwrap();
    let ns = container_namespace();
    ns.fail_on(FailPoint::AddFilter("eth0".into()));

    let err = NetworkManager::new("dynamic", config(locks.path()), ns.clone())
        .unwrap()
        .setup()
        .unwrap_err();
    assert!(matches!(err, NetworkError::FilterInstallFailed { .. }));
    assert!(ns.tap_names().is_empty());
    assert!(!ns.link("eth0").unwrap().ingress_qdisc);
}

// ── Static policy ────────────────────────────────────────────────────

#[test]
fn pipeline_static_setup_uses_primary_interface() {
    let ns = container_namespace();
    let manager = NetworkManager::new("static", NetworkConfig::default(), ns.clone()).unwrap();

    let info = manager.setup().unwrap();
    assert_eq!(info.tap_device, "eth0");
    assert!(ns.tap_names().is_empty());

    let mut mewz = new_unikernel("mewz").unwrap();
    mewz.init(&UnikernelParams::from_network(&info, "")).unwrap();
    assert_eq!(mewz.command_string().unwrap(), "10.0.0.5/24 10.0.0.1 ");
}

// ── Configuration ────────────────────────────────────────────────────

#[test]
fn pipeline_config_file_drives_naming() {
    let locks = tempfile::tempdir().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "tap_name_template": "vmtapX",
            "tap_ip_template": "10.200.X.1",
            "owner_uid": 1000,
            "owner_gid": 1000,
            "lock_dir": {}
        }}"#,
        serde_json::to_string(locks.path()).unwrap()
    )
    .unwrap();

    let config = NetworkConfig::load(file.path()).unwrap();
    let ns = container_namespace();
    let info = NetworkManager::new("dynamic", config, ns.clone())
        .unwrap()
        .setup()
        .unwrap();

    assert_eq!(info.tap_device, "vmtap0");
    let tap = ns.link("vmtap0").unwrap();
    assert_eq!(tap.owner, Some(1000));
    assert_eq!(
        tap.addresses[0].address,
        std::net::IpAddr::V4(Ipv4Addr::new(10, 200, 1, 1))
    );
}

#[test]
fn pipeline_unknown_policy_is_rejected() {
    let err = NetworkManager::new("bridge", NetworkConfig::default(), container_namespace())
        .unwrap_err();
    assert_eq!(err.to_string(), "network manager bridge not supported");
}
