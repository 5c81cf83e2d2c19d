//! Address-to-key derivation.
//!
//! Counters are keyed by u64. IPv4 addresses map directly; IPv6 addresses
//! map to three keys, one per tracked prefix length, by masking the high 64
//! bits of the address. The inverse mappings are only used when rendering
//! debug output.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The IPv4 address as a big-endian integer, widened to 64 bits.
pub(super) fn ipv4_key(ip: Ipv4Addr) -> u64 {
    u64::from(u32::from(ip))
}

/// The /48, /56 and /64 prefixes of an IPv6 address, each as a u64 taken
/// from the high 64 bits of the address with the excess low bits cleared.
pub(super) fn ipv6_prefix_keys(ip: Ipv6Addr) -> (u64, u64, u64) {
    let k64 = (u128::from(ip) >> 64) as u64;
    let k56 = k64 & 0xffff_ffff_ffff_ff00;
    let k48 = k64 & 0xffff_ffff_ffff_0000;
    (k48, k56, k64)
}

pub(super) fn key_to_ipv4(key: u64) -> IpAddr {
    IpAddr::V4(Ipv4Addr::from(key as u32))
}

pub(super) fn key_to_ipv6(key: u64) -> IpAddr {
    IpAddr::V6(Ipv6Addr::from(u128::from(key) << 64))
}
