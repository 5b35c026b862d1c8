//! swarmscale.toml configuration parser.
//!
//! Every section is optional; missing keys fall back to the defaults of
//! the reference deployment (1..=5 replicas, 0.5s/0.8s thresholds, ratio 2,
//! 10s interval, sliding window over the last 10 requests).

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoscalerConfig {
    pub scaling: ScalingConfig,
    pub window: WindowConfig,
    pub service: ServiceConfig,
    pub orchestrator: OrchestratorConfig,
    pub server: ServerConfig,
}

/// Policy parameters. Immutable once the daemon has started.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScalingConfig {
    pub min_instances: u32,
    pub max_instances: u32,
    /// Scale up when the window mean is strictly above this.
    pub scale_up_threshold_secs: f64,
    /// Scale down when the window mean is strictly below this.
    pub scale_down_threshold_secs: f64,
    pub step_mode: StepMode,
    /// Replicas added/removed per step (fixed) or multiplier (ratio).
    pub step_value: f64,
    pub monitoring_interval_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// `current ± step_value`
    Fixed,
    /// `ceil(current * step_value)` up, `floor(current / step_value)` down.
    Ratio,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub mode: WindowMode,
    /// Ring size for the sliding variant. Ignored when draining.
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Every cycle consumes and clears the samples recorded since the last one.
    Draining,
    /// Fixed-capacity ring of the most recent samples, zero-filled at start.
    Sliding,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name of the worker service to scale.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// `unix:///path/to/docker.sock` or `tcp://host:port`.
    pub endpoint: String,
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            scaling: ScalingConfig::default(),
            window: WindowConfig::default(),
            service: ServiceConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_instances: 1,
            max_instances: 5,
            scale_up_threshold_secs: 0.8,
            scale_down_threshold_secs: 0.5,
            step_mode: StepMode::Ratio,
            step_value: 2.0,
            monitoring_interval_secs: 10.0,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            mode: WindowMode::Sliding,
            capacity: 10,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "web".to_string(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/run/docker.sock".to_string(),
            timeout_secs: 5.0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8001)),
        }
    }
}

impl AutoscalerConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: AutoscalerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.scaling.validate()?;

        if self.window.mode == WindowMode::Sliding && self.window.capacity == 0 {
            return Err(invalid("window.capacity must be at least 1 in sliding mode"));
        }
        if self.service.name.trim().is_empty() {
            return Err(invalid("service.name must not be empty"));
        }
        if !self.orchestrator.timeout_secs.is_finite() || self.orchestrator.timeout_secs <= 0.0 {
            return Err(invalid("orchestrator.timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl ScalingConfig {
    /// Check that the policy is well-defined.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_instances > self.max_instances {
            return Err(invalid(format!(
                "min_instances ({}) exceeds max_instances ({})",
                self.min_instances, self.max_instances
            )));
        }

        let up = self.scale_up_threshold_secs;
        let down = self.scale_down_threshold_secs;
        if !up.is_finite() || !down.is_finite() || up < 0.0 || down < 0.0 {
            return Err(invalid("thresholds must be finite and non-negative"));
        }
        if down >= up {
            return Err(invalid(format!(
                "scale_down_threshold_secs ({down}) must be below scale_up_threshold_secs ({up})"
            )));
        }

        if !self.monitoring_interval_secs.is_finite() || self.monitoring_interval_secs <= 0.0 {
            return Err(invalid("monitoring_interval_secs must be positive"));
        }

        match self.step_mode {
            StepMode::Fixed => {
                let step = self.step_value;
                if !(step >= 1.0 && step.fract() == 0.0 && step <= f64::from(u32::MAX)) {
                    return Err(invalid(format!(
                        "fixed step_value must be a positive integer, got {step}"
                    )));
                }
            }
            StepMode::Ratio => {
                if !(self.step_value.is_finite() && self.step_value > 1.0) {
                    return Err(invalid(format!(
                        "ratio step_value must be greater than 1, got {}",
                        self.step_value
                    )));
                }
            }
        }
        Ok(())
    }

    /// Step size in replicas for [`StepMode::Fixed`].
    pub fn fixed_step(&self) -> u32 {
        self.step_value as u32
    }

    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_secs_f64(self.monitoring_interval_secs)
    }
}

impl OrchestratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
