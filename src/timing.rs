//! Explicit profiling context.
//!
//! Each run owns its own `Profiler`; nothing is process-wide, so independent
//! chains never share timer state.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::info;

#[derive(Debug, Default, Clone)]
pub struct Profiler {
    totals: BTreeMap<String, Duration>,
    counts: BTreeMap<String, usize>,
    running: BTreeMap<String, Instant>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, label: &str) {
        self.running.insert(label.to_string(), Instant::now());
    }

    /// Stop a running timer. Stopping a timer that was never started is a no-op.
    pub fn stop(&mut self, label: &str) {
        if let Some(start) = self.running.remove(label) {
            *self.totals.entry(label.to_string()).or_default() += start.elapsed();
            *self.counts.entry(label.to_string()).or_default() += 1;
        }
    }

    /// Time a closure under `label`.
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        self.start(label);
        let out = f();
        self.stop(label);
        out
    }

    pub fn total(&self, label: &str) -> Duration {
        self.totals.get(label).copied().unwrap_or_default()
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Fold another profiler's totals into this one.
    pub fn merge(&mut self, other: &Profiler) {
        for (label, d) in &other.totals {
            *self.totals.entry(label.clone()).or_default() += *d;
        }
        for (label, c) in &other.counts {
            *self.counts.entry(label.clone()).or_default() += *c;
        }
    }

    pub fn print_timers(&self) {
        for (label, d) in &self.totals {
            info!(
                "timer {:<28} {:>10.4} s over {} call(s)",
                label,
                d.as_secs_f64(),
                self.count(label)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_accumulates() {
        let mut p = Profiler::new();
        let x = p.time("work", || 2 + 2);
        p.time("work", || ());
        assert_eq!(x, 4);
        assert_eq!(p.count("work"), 2);
        assert_eq!(p.count("missing"), 0);
    }

    #[test]
    fn test_independent_profilers() {
        let mut a = Profiler::new();
        let b = Profiler::new();
        a.time("a", || ());
        assert_eq!(a.count("a"), 1);
        assert_eq!(b.count("a"), 0);
        let mut c = Profiler::new();
        c.merge(&a);
        c.merge(&a);
        assert_eq!(c.count("a"), 2);
    }
}
