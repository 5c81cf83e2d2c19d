//! The public per-IP limiter: one counter for IPv4, three for IPv6.

use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use crate::ratelimit::counter::{now_nanos, Counter, Nanos};
use crate::ratelimit::key::{ipv4_key, ipv6_prefix_keys};

/// A rate limiter keyed on source IP address.
///
/// Per address, up to `requests` checks per `period` are admitted; once the
/// quota is exhausted, checks are denied until `period` has passed since the
/// first admitted one. At most `size` addresses are tracked per counter;
/// beyond that, the least recently seen are dropped. See the module
/// documentation for how IPv6 addresses are bucketed by prefix.
pub struct IpLimiter {
    pub(super) ipv4: Counter,
    pub(super) v48: Counter,
    pub(super) v56: Counter,
    pub(super) v64: Counter,
}

impl IpLimiter {
    pub fn new(requests: u64, period: Duration, size: usize) -> Self {
        IpLimiter {
            ipv4: Counter::new(requests, period, size),
            v64: Counter::new(requests, period, size),
            v56: Counter::new(requests, period / 4, size),
            v48: Counter::new(requests, period / 8, size),
        }
    }

    /// Override the rate for IPv6 /48 prefixes. Only valid before the
    /// limiter starts taking traffic, which the exclusive borrow enforces.
    pub fn set_ipv6_48_rate(&mut self, requests: u64, period: Duration) {
        self.v48.set_rate(requests, period);
    }

    /// Override the rate for IPv6 /56 prefixes. Only valid before the
    /// limiter starts taking traffic.
    pub fn set_ipv6_56_rate(&mut self, requests: u64, period: Duration) {
        self.v56.set_rate(requests, period);
    }

    /// Override the rate for IPv6 /64 prefixes. Only valid before the
    /// limiter starts taking traffic.
    pub fn set_ipv6_64_rate(&mut self, requests: u64, period: Duration) {
        self.v64.set_rate(requests, period);
    }

    /// Whether a request from `ip` should be admitted. Counts the request
    /// against the address' quota.
    pub fn allow(&self, ip: IpAddr) -> bool {
        self.allow_at(ip, now_nanos())
    }

    fn allow_at(&self, ip: IpAddr, now: Nanos) -> bool {
        match ip {
            IpAddr::V4(v4) => self.ipv4.allow_at(ipv4_key(v4), now),
            IpAddr::V6(v6) => {
                if let Some(v4) = v6.to_ipv4_mapped() {
                    return self.ipv4.allow_at(ipv4_key(v4), now);
                }
                // All three prefix counters see the request, and all three
                // must admit it. No short-circuiting: each granularity
                // accounts for every request it observes, even when another
                // one already denied it.
                let (a48, a56, a64) = self.allow_v6_at(v6, now);
                a48 && a56 && a64
            }
        }
    }

    pub(super) fn allow_v6_at(&self, ip: Ipv6Addr, now: Nanos) -> (bool, bool, bool) {
        let (k48, k56, k64) = ipv6_prefix_keys(ip);
        (
            self.v48.allow_at(k48, now),
            self.v56.allow_at(k56, now),
            self.v64.allow_at(k64, now),
        )
    }
}
