//! Observability subsystem.
//!
//! Structured logging goes through `tracing` directly at the call sites;
//! this module owns the metrics side: exporter setup and small helpers so
//! recording stays a one-liner in the hot paths.

pub mod metrics;
