//! Scaling policy: a pure function of replica count, statistic and config.

use swarmscale_core::{ScalingConfig, StepMode};

/// Which side of the hysteresis band a statistic falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    Up,
    Down,
    /// Inside the band, including both thresholds. NaN also lands here.
    Hold,
}

/// A scaling decision for the worker service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Scale to the specified replica count.
    ScaleTo(u32),
    /// No change needed.
    NoChange,
}

impl ScaleDecision {
    pub fn between(current: u32, target: u32) -> Self {
        if target == current {
            Self::NoChange
        } else {
            Self::ScaleTo(target)
        }
    }
}

/// Classify a window statistic against the thresholds. Both are strict.
pub fn pressure(stat: f64, config: &ScalingConfig) -> Pressure {
    if stat > config.scale_up_threshold_secs {
        Pressure::Up
    } else if stat < config.scale_down_threshold_secs {
        Pressure::Down
    } else {
        Pressure::Hold
    }
}

/// Target replica count for `current` replicas under statistic `stat`.
///
/// Always within `[min_instances, max_instances]`, even when `current`
/// was set outside that range externally. Assumes a validated config.
pub fn decide(current: u32, stat: f64, config: &ScalingConfig) -> u32 {
    let candidate = match (pressure(stat, config), config.step_mode) {
        (Pressure::Hold, _) => current,
        (Pressure::Up, StepMode::Fixed) => current.saturating_add(config.fixed_step()),
        (Pressure::Down, StepMode::Fixed) => current.saturating_sub(config.fixed_step()),
        // A ratio cannot grow an empty fleet, so always add at least one.
        (Pressure::Up, StepMode::Ratio) => {
            let scaled = (f64::from(current) * config.step_value).ceil() as u32;
            scaled.max(current.saturating_add(1))
        }
        (Pressure::Down, StepMode::Ratio) => {
            (f64::from(current) / config.step_value).floor() as u32
        }
    };

    candidate.max(config.min_instances).min(config.max_instances)
}
