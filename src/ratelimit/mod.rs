//! Per-source-address admission control.
//!
//! A [`IpLimiter`] is configured with a maximum number of requests to allow
//! per IP address within a given time period. It tracks at most a fixed
//! number of addresses, evicting the least recently seen ones, so memory
//! stays bounded no matter how many distinct clients show up.
//!
//! The goal is coarse abuse prevention, not accurate request accounting, and
//! the implementation choices reflect that.
//!
//! For IPv4, the full address is the limiting key.
//!
//! For IPv6, end users typically control a /64, /56 or /48, so keying on the
//! full address would let an abuser rotate through their range freely, while
//! keying on a single wide prefix would over-block unrelated users. We run
//! three counters in parallel, one per common prefix length, and any of them
//! can deny a request. By default the /64 counter gets the configured rate,
//! the /56 counter the same quota over a quarter of the period, and the /48
//! counter the same quota over an eighth; each can be overridden before the
//! limiter takes traffic.
//!
//! Rate-limiting 0.0.0.0 (or ::) is not supported; those keys are treated as
//! 0.0.0.1 (resp. ::0.0.0.1).
//!
//! All admission checks are synchronous and take one mutex for O(1) work;
//! the limiter is safe to share across tasks behind an `Arc`.

mod counter;
mod debug;
mod key;
mod limiter;
mod registry;

pub use limiter::IpLimiter;
pub use registry::{CounterOccupancy, LimiterOccupancy, LimiterRegistry};
