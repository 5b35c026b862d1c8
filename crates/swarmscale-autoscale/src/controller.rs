//! Autoscaler: the actuator and its timed control loop.
//!
//! Each cycle closes the current latency window, resolves the worker
//! service, re-reads its replica count, and issues a scale request only
//! when the policy target differs from it. The outcome of every
//! successful cycle is appended to the telemetry log.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use swarmscale_core::{Orchestrator, OrchestratorError, OrchestratorResult, ScalingConfig};
use swarmscale_metrics::{PlotPoint, SampleBuffer, TelemetryLog, mean};

use crate::policy::{ScaleDecision, decide};

/// What a single decision cycle saw and did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Samples the statistic was computed over.
    pub samples: usize,
    /// Reports received during the window.
    pub arrivals: u64,
    pub average_latency_secs: f64,
    pub workload_rate: f64,
    /// Replica count read from the orchestrator at the start of the cycle.
    pub current: u32,
    pub decision: ScaleDecision,
}

impl CycleReport {
    /// Replica count the cycle left the service at.
    pub fn replicas(&self) -> u32 {
        match self.decision {
            ScaleDecision::ScaleTo(n) => n,
            ScaleDecision::NoChange => self.current,
        }
    }
}

/// Drives the orchestrator from the latency window.
pub struct Autoscaler<O> {
    orchestrator: O,
    config: ScalingConfig,
    service: String,
    buffer: SampleBuffer,
    telemetry: TelemetryLog,
    started: Instant,
}

impl<O: Orchestrator> Autoscaler<O> {
    /// Create an autoscaler for the service called `service`.
    ///
    /// `config` must already be validated.
    pub fn new(
        orchestrator: O,
        config: ScalingConfig,
        service: impl Into<String>,
        buffer: SampleBuffer,
    ) -> Self {
        Self {
            orchestrator,
            config,
            service: service.into(),
            buffer,
            telemetry: TelemetryLog::new(),
            started: Instant::now(),
        }
    }

    /// Write cycle telemetry into an existing log.
    pub fn with_telemetry(mut self, telemetry: TelemetryLog) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &TelemetryLog {
        &self.telemetry
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    /// Run one decision cycle.
    ///
    /// The window is closed before the orchestrator is contacted, so a
    /// failed cycle still consumes its samples.
    pub async fn tick(&self) -> OrchestratorResult<CycleReport> {
        let window = self.buffer.drain_snapshot().await;
        let stat = mean(&window.samples);
        let workload_rate = window.arrivals as f64 / self.config.monitoring_interval_secs;

        let service = self.orchestrator.find_service(&self.service).await?;
        let current = self.orchestrator.replica_count(&service).await?;
        let target = decide(current, stat, &self.config);
        let decision = ScaleDecision::between(current, target);

        if let ScaleDecision::ScaleTo(replicas) = decision {
            self.orchestrator
                .set_replica_count(&service, replicas)
                .await?;
            info!(
                service = %self.service,
                from = current,
                to = replicas,
                average_latency_secs = stat,
                up_threshold = self.config.scale_up_threshold_secs,
                down_threshold = self.config.scale_down_threshold_secs,
                "scaling service"
            );
        }

        let report = CycleReport {
            samples: window.samples.len(),
            arrivals: window.arrivals,
            average_latency_secs: stat,
            workload_rate,
            current,
            decision,
        };

        self.telemetry
            .append(PlotPoint {
                elapsed_secs: self.started.elapsed().as_secs_f64(),
                average_latency_secs: stat,
                workload_rate,
                replicas: report.replicas(),
            })
            .await;

        Ok(report)
    }

    /// Run the control loop until shutdown.
    ///
    /// Cycles run inline, so a slow cycle delays the next tick instead of
    /// overlapping it. A cycle in progress when shutdown is signalled runs
    /// to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.monitoring_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            service = %self.service,
            interval_secs = period.as_secs_f64(),
            min = self.config.min_instances,
            max = self.config.max_instances,
            "autoscaler started"
        );

        if *shutdown.borrow_and_update() {
            info!("autoscaler shutting down");
            return;
        }

        loop {
            // Shutdown wins over a tick that is already due.
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let began = Instant::now();
                    match self.tick().await {
                        Ok(report) => debug!(
                            service = %self.service,
                            samples = report.samples,
                            average_latency_secs = report.average_latency_secs,
                            workload_rate = report.workload_rate,
                            replicas = report.replicas(),
                            "decision cycle complete"
                        ),
                        Err(e) => report_cycle_error(&self.service, &e),
                    }
                    warn_on_overrun(began.elapsed(), period);
                }
            }
        }
    }
}

fn report_cycle_error(service: &str, err: &OrchestratorError) {
    match err {
        OrchestratorError::NotFound(_) => error!(
            %service,
            error = %err,
            "worker service not found, check service.name; polling continues"
        ),
        e if e.is_transient() => warn!(%service, error = %err, "decision cycle skipped"),
        _ => error!(%service, error = %err, "decision cycle failed"),
    }
}

/// Returns whether the cycle overran.
fn warn_on_overrun(elapsed: Duration, period: Duration) -> bool {
    let overran = elapsed > period;
    if overran {
        warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            interval_ms = period.as_millis() as u64,
            "decision cycle overran the monitoring interval"
        );
    }
    overran
}
