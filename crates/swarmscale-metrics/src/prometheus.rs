//! Prometheus text exposition format.
//!
//! Renders the most recent telemetry point as gauges so the autoscaler
//! can be scraped alongside the worker fleet.

use crate::telemetry::PlotPoint;

/// Render the latest cycle and the cycle count into Prometheus text format.
///
/// Gauges are omitted until the first cycle has completed.
pub fn render_prometheus(latest: Option<&PlotPoint>, cycles: usize) -> String {
    let mut out = String::new();

    out.push_str("# HELP swarmscale_cycles_total Completed decision cycles.\n");
    out.push_str("# TYPE swarmscale_cycles_total counter\n");
    out.push_str(&format!("swarmscale_cycles_total {cycles}\n"));

    let Some(p) = latest else {
        return out;
    };

    out.push_str(
        "# HELP swarmscale_average_latency_seconds Mean latency over the last window.\n",
    );
    out.push_str("# TYPE swarmscale_average_latency_seconds gauge\n");
    out.push_str(&format!(
        "swarmscale_average_latency_seconds {:.6}\n",
        p.average_latency_secs
    ));

    out.push_str("# HELP swarmscale_workload_rate Latency reports per second over the last window.\n");
    out.push_str("# TYPE swarmscale_workload_rate gauge\n");
    out.push_str(&format!("swarmscale_workload_rate {:.4}\n", p.workload_rate));

    out.push_str("# HELP swarmscale_replicas Replica count after the last cycle.\n");
    out.push_str("# TYPE swarmscale_replicas gauge\n");
    out.push_str(&format!("swarmscale_replicas {}\n", p.replicas));

    out
}
