//! Named limiters built from configuration.
//!
//! Listeners and forwarders reference limiters by name, and the admin
//! endpoints enumerate them. The registry is built once at startup and then
//! only read; per-limiter IPv6 overrides are applied here, before the
//! limiters are shared.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::RateLimitConfig;
use crate::ratelimit::IpLimiter;

/// Used when a config leaves `size` unset or zero.
const DEFAULT_SIZE: usize = 1000;

pub struct LimiterRegistry {
    limiters: BTreeMap<String, Arc<IpLimiter>>,
}

impl LimiterRegistry {
    pub fn from_config(configs: &BTreeMap<String, RateLimitConfig>) -> Self {
        let mut limiters = BTreeMap::new();
        for (name, cfg) in configs {
            let size = if cfg.size == 0 { DEFAULT_SIZE } else { cfg.size };
            let mut limiter =
                IpLimiter::new(cfg.requests, Duration::from_millis(cfg.period_ms), size);

            if let Some(o) = &cfg.ipv6_48 {
                limiter.set_ipv6_48_rate(o.requests, Duration::from_millis(o.period_ms));
            }
            if let Some(o) = &cfg.ipv6_56 {
                limiter.set_ipv6_56_rate(o.requests, Duration::from_millis(o.period_ms));
            }
            if let Some(o) = &cfg.ipv6_64 {
                limiter.set_ipv6_64_rate(o.requests, Duration::from_millis(o.period_ms));
            }

            tracing::info!(
                limiter = %name,
                requests = cfg.requests,
                period_ms = cfg.period_ms,
                size,
                "Rate limit configured"
            );
            limiters.insert(name.clone(), Arc::new(limiter));
        }
        LimiterRegistry { limiters }
    }

    pub fn get(&self, name: &str) -> Option<Arc<IpLimiter>> {
        self.limiters.get(name).cloned()
    }

    /// Limiters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<IpLimiter>)> {
        self.limiters.iter().map(|(name, l)| (name.as_str(), l))
    }

    /// Per-limiter occupancy summary, in name order.
    pub fn occupancy(&self) -> Vec<LimiterOccupancy> {
        self.limiters
            .iter()
            .map(|(name, l)| LimiterOccupancy {
                name: name.clone(),
                ipv4: l.ipv4.occupancy().into(),
                ipv6_48: l.v48.occupancy().into(),
                ipv6_56: l.v56.occupancy().into(),
                ipv6_64: l.v64.occupancy().into(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct CounterOccupancy {
    pub tracked: usize,
    pub capacity: usize,
}

impl From<(usize, usize)> for CounterOccupancy {
    fn from((tracked, capacity): (usize, usize)) -> Self {
        CounterOccupancy { tracked, capacity }
    }
}

#[derive(Debug, Serialize)]
pub struct LimiterOccupancy {
    pub name: String,
    pub ipv4: CounterOccupancy,
    pub ipv6_48: CounterOccupancy,
    pub ipv6_56: CounterOccupancy,
    pub ipv6_64: CounterOccupancy,
}
