//! Bounded-memory percentile estimation via reservoir sampling, grounded in
//! the Python original's `PercentileTracker`.

use rand::Rng;
use serde_json::{Value, json};

pub struct ReservoirSampler {
    capacity: usize,
    samples: Vec<f64>,
    seen: u64,
}

impl ReservoirSampler {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::with_capacity(capacity.min(1024)),
            seen: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.seen += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(value);
            return;
        }
        let idx = rand::thread_rng().gen_range(0..self.seen);
        if (idx as usize) < self.capacity {
            self.samples[idx as usize] = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let rank = (sorted.len() - 1) as f64 * (p / 100.0);
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        if lower == upper {
            return sorted[lower];
        }
        let fraction = rank - lower as f64;
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }

    pub fn get_percentiles(&self) -> Value {
        json!({
            "p50": round2(self.percentile(50.0)),
            "p90": round2(self.percentile(90.0)),
            "p95": round2(self.percentile(95.0)),
            "p99": round2(self.percentile(99.0)),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
