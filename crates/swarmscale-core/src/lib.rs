//! swarmscale-core: shared types for the swarmscale autoscaler.
//!
//! Holds the process-wide configuration (parsed from TOML, validated once
//! at startup), the error taxonomy shared by the control loop and the
//! orchestrator clients, and the [`Orchestrator`] capability trait that
//! the actuator drives.
//!
//! # Architecture
//!
//! ```text
//! AutoscalerConfig (swarmscale.toml)
//!   ├── ScalingConfig   → policy thresholds, step, interval
//!   ├── WindowConfig    → draining or sliding sample window
//!   ├── ServiceConfig   → name of the scaled worker service
//!   ├── OrchestratorConfig → Docker endpoint + request timeout
//!   └── ServerConfig    → ingestion listen address
//!
//! Orchestrator (trait)
//!   ├── DockerSwarm          (swarmscale-swarm)
//!   └── InMemoryOrchestrator (fake, dry-run + tests)
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::{
    AutoscalerConfig, OrchestratorConfig, ScalingConfig, ServerConfig, ServiceConfig, StepMode,
    WindowConfig, WindowMode,
};
pub use error::{ConfigError, ConfigResult, OrchestratorError, OrchestratorResult};
pub use orchestrator::{InMemoryOrchestrator, Orchestrator, ServiceHandle};
