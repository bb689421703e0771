//! Default gateway discovery from `/proc/net/route`.
//!
//! The file lists the IPv4 routing table of the reader's namespace. Each
//! address column holds the 32-bit network-order value printed as host-order
//! hex, so decoding uses native byte order.

use std::net::Ipv4Addr;

/// Routing table of the calling process's namespace.
pub const PROC_NET_ROUTE: &str = "/proc/net/route";

const RTF_UP: u32 = 0x0001;
const RTF_GATEWAY: u32 = 0x0002;

/// Returns the gateway of the lowest-metric IPv4 default route.
///
/// Only routes that are up, go through a gateway, and have an all-zero
/// destination and mask count as default routes. Malformed lines are skipped.
#[must_use]
pub fn parse_default_gateway(table: &str) -> Option<Ipv4Addr> {
    table
        .lines()
        .skip(1)
        .filter_map(parse_default_route)
        .min_by_key(|&(_, metric)| metric)
        .map(|(gateway, _)| gateway)
}

fn parse_default_route(line: &str) -> Option<(Ipv4Addr, u32)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    // Iface Destination Gateway Flags RefCnt Use Metric Mask ...
    if fields.len() < 8 {
        return None;
    }
    let destination = parse_hex_addr(fields[1])?;
    let gateway = parse_hex_addr(fields[2])?;
    let flags = u32::from_str_radix(fields[3], 16).ok()?;
    let metric = fields[6].parse::<u32>().ok()?;
    let mask = parse_hex_addr(fields[7])?;

    let is_default = destination.is_unspecified() && mask.is_unspecified();
    let usable = flags & (RTF_UP | RTF_GATEWAY) == RTF_UP | RTF_GATEWAY;
    (is_default && usable).then_some((gateway, metric))
}

fn parse_hex_addr(field: &str) -> Option<Ipv4Addr> {
    let raw = u32::from_str_radix(field, 16).ok()?;
    Some(Ipv4Addr::from(raw.to_ne_bytes()))
}
