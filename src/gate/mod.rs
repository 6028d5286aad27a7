//! Kernel and extension gate scorers, plus the telemetry bridge that feeds
//! raw process events into the kernel gate.

pub mod bridge;
pub mod extension;
pub mod kernel;
