//! swarmscale-autoscale: latency-driven replica scaling.
//!
//! Once per monitoring interval the [`Autoscaler`] closes the current
//! latency window, averages it, re-reads the replica count from the
//! orchestrator, and asks [`policy::decide`] for a target.
//!
//! # Scaling Algorithm
//!
//! ```text
//! stat = mean(window)            // 0.0 for an empty window
//!
//! if stat > scale_up_threshold:
//!     candidate = current + step          (fixed)
//!     candidate = ceil(current * ratio)   (ratio)
//! elif stat < scale_down_threshold:
//!     candidate = current - step          (fixed)
//!     candidate = floor(current / ratio)  (ratio)
//! else:
//!     candidate = current                 // hysteresis band
//!
//! target = clamp(candidate, min_instances, max_instances)
//! if target != current: ScaleTo(target)
//! ```
//!
//! The band between the two thresholds keeps the fleet from oscillating.
//! Cycles never overlap and orchestrator failures only skip a cycle.

pub mod controller;
pub mod policy;

pub use controller::{Autoscaler, CycleReport};
pub use policy::{Pressure, ScaleDecision, decide};
