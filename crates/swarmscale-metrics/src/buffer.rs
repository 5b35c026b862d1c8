//! Latency sample buffer shared by the ingestion endpoint and the control loop.
//!
//! A single mutex guards the sample collection and the arrival counter.
//! Both `record` and `drain_snapshot` hold it only for the push/swap, so
//! ingestion never waits on a decision cycle.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use swarmscale_core::{WindowConfig, WindowMode};

/// One completed request's end-to-end time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct LatencySample(f64);

/// A reported latency that is not a finite, non-negative number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid latency sample: {0:?}")]
pub struct InvalidSample(pub String);

impl LatencySample {
    pub fn new(secs: f64) -> Result<Self, InvalidSample> {
        if secs.is_finite() && secs >= 0.0 {
            Ok(Self(secs))
        } else {
            Err(InvalidSample(secs.to_string()))
        }
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }
}

impl FromStr for LatencySample {
    type Err = InvalidSample;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs: f64 = s
            .trim()
            .parse()
            .map_err(|_| InvalidSample(s.to_string()))?;
        Self::new(secs).map_err(|_| InvalidSample(s.to_string()))
    }
}

impl fmt::Display for LatencySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// The contents of one monitoring window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    /// Samples the statistic is computed over, oldest first.
    pub samples: Vec<f64>,
    /// Reports received since the previous snapshot.
    pub arrivals: u64,
}

struct Window {
    mode: WindowMode,
    capacity: usize,
    samples: VecDeque<f64>,
    arrivals: u64,
}

/// Concurrency-safe latency buffer.
///
/// Cloning shares the underlying window.
#[derive(Clone)]
pub struct SampleBuffer {
    window: Arc<Mutex<Window>>,
}

impl SampleBuffer {
    /// Buffer that hands every sample to exactly one snapshot.
    pub fn draining() -> Self {
        Self::with_window(Window {
            mode: WindowMode::Draining,
            capacity: 0,
            samples: VecDeque::new(),
            arrivals: 0,
        })
    }

    /// Ring of the last `capacity` samples, zero-filled until it wraps.
    pub fn sliding(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self::with_window(Window {
            mode: WindowMode::Sliding,
            capacity,
            samples: std::iter::repeat_n(0.0, capacity).collect(),
            arrivals: 0,
        })
    }

    pub fn from_config(config: &WindowConfig) -> Self {
        match config.mode {
            WindowMode::Draining => Self::draining(),
            WindowMode::Sliding => Self::sliding(config.capacity),
        }
    }

    fn with_window(window: Window) -> Self {
        Self {
            window: Arc::new(Mutex::new(window)),
        }
    }

    pub async fn mode(&self) -> WindowMode {
        self.window.lock().await.mode
    }

    /// Append a sample. Evicts the oldest one when a sliding ring is full.
    pub async fn record(&self, sample: LatencySample) {
        let mut window = self.window.lock().await;
        window.samples.push_back(sample.as_secs());
        if window.mode == WindowMode::Sliding && window.samples.len() > window.capacity {
            window.samples.pop_front();
        }
        window.arrivals += 1;
    }

    /// Close the current window.
    ///
    /// Draining buffers return their samples and reset to empty; sliding
    /// buffers return a copy of the ring and keep it. The arrival counter
    /// resets in both modes.
    pub async fn drain_snapshot(&self) -> WindowSnapshot {
        let mut window = self.window.lock().await;
        let arrivals = std::mem::take(&mut window.arrivals);
        let mode = window.mode;
        let samples: Vec<f64> = match mode {
            WindowMode::Draining => std::mem::take(&mut window.samples).into(),
            WindowMode::Sliding => window.samples.iter().copied().collect(),
        };
        drop(window);

        debug!(samples = samples.len(), arrivals, "window snapshot taken");
        WindowSnapshot { samples, arrivals }
    }

    /// Number of samples currently held.
    pub async fn len(&self) -> usize {
        self.window.lock().await.samples.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(secs: f64) -> LatencySample {
        LatencySample::new(secs).unwrap()
    }

    #[test]
    fn parse_valid_samples() {
        assert_eq!("0.25".parse::<LatencySample>().unwrap().as_secs(), 0.25);
        assert_eq!(" 3\n".parse::<LatencySample>().unwrap().as_secs(), 3.0);
        assert_eq!("0".parse::<LatencySample>().unwrap().as_secs(), 0.0);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("".parse::<LatencySample>().is_err());
        assert!("fast".parse::<LatencySample>().is_err());
        assert!("-0.5".parse::<LatencySample>().is_err());
        assert!("NaN".parse::<LatencySample>().is_err());
        assert!("inf".parse::<LatencySample>().is_err());
        assert!("1.0 2.0".parse::<LatencySample>().is_err());
    }

    #[tokio::test]
    async fn draining_returns_and_clears() {
        let buffer = SampleBuffer::draining();
        buffer.record(sample(1.0)).await;
        buffer.record(sample(2.0)).await;

        let snap = buffer.drain_snapshot().await;
        assert_eq!(snap.samples, vec![1.0, 2.0]);
        assert_eq!(snap.arrivals, 2);
        assert!(buffer.is_empty().await);

        let next = buffer.drain_snapshot().await;
        assert!(next.samples.is_empty());
        assert_eq!(next.arrivals, 0);
    }

    #[tokio::test]
    async fn sliding_starts_zero_filled() {
        let buffer = SampleBuffer::sliding(4);
        let snap = buffer.drain_snapshot().await;
        assert_eq!(snap.samples, vec![0.0; 4]);
        assert_eq!(snap.arrivals, 0);
    }

    #[tokio::test]
    async fn sliding_evicts_oldest_and_retains() {
        let buffer = SampleBuffer::sliding(3);
        for secs in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buffer.record(sample(secs)).await;
        }

        let snap = buffer.drain_snapshot().await;
        assert_eq!(snap.samples, vec![3.0, 4.0, 5.0]);
        assert_eq!(snap.arrivals, 5);

        // The ring survives the snapshot; only the arrival count resets.
        let again = buffer.drain_snapshot().await;
        assert_eq!(again.samples, vec![3.0, 4.0, 5.0]);
        assert_eq!(again.arrivals, 0);
        assert_eq!(buffer.len().await, 3);
    }

    #[tokio::test]
    async fn from_config_selects_mode() {
        let draining = SampleBuffer::from_config(&WindowConfig {
            mode: WindowMode::Draining,
            capacity: 10,
        });
        assert_eq!(draining.mode().await, WindowMode::Draining);
        assert!(draining.is_empty().await);

        let sliding = SampleBuffer::from_config(&WindowConfig::default());
        assert_eq!(sliding.mode().await, WindowMode::Sliding);
        assert_eq!(sliding.len().await, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_are_never_lost() {
        const WRITERS: usize = 32;
        const PER_WRITER: usize = 250;

        let buffer = SampleBuffer::draining();
        let mut handles = Vec::new();
        for w in 0..WRITERS {
            let buffer = buffer.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..PER_WRITER {
                    let secs = (w * PER_WRITER + i) as f64;
                    buffer.record(sample(secs)).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let snap = buffer.drain_snapshot().await;
        assert_eq!(snap.samples.len(), WRITERS * PER_WRITER);
        assert_eq!(snap.arrivals, (WRITERS * PER_WRITER) as u64);

        // Every value is unique, so duplicates or drops would show up here.
        let mut values: Vec<u64> = snap.samples.iter().map(|s| *s as u64).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), WRITERS * PER_WRITER);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn drains_racing_writers_partition_samples() {
        const WRITERS: usize = 16;
        const PER_WRITER: usize = 200;

        let buffer = SampleBuffer::draining();
        let mut writers = Vec::new();
        for _ in 0..WRITERS {
            let buffer = buffer.clone();
            writers.push(tokio::spawn(async move {
                for _ in 0..PER_WRITER {
                    buffer.record(sample(0.1)).await;
                    tokio::task::yield_now().await;
                }
            }));
        }

        let drainer = {
            let buffer = buffer.clone();
            tokio::spawn(async move {
                let mut seen = 0usize;
                for _ in 0..50 {
                    seen += buffer.drain_snapshot().await.samples.len();
                    tokio::task::yield_now().await;
                }
                seen
            })
        };

        for w in writers {
            w.await.unwrap();
        }
        let mut total = drainer.await.unwrap();
        total += buffer.drain_snapshot().await.samples.len();

        assert_eq!(total, WRITERS * PER_WRITER);
    }
}
