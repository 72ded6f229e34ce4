//! Metrics collection and export module

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::time::Instant;

use crate::diagnosis::Diagnosis;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub operations_submitted: IntCounterVec,
    pub operations_confirmed: IntCounterVec,
    pub diagnoses_total: IntCounterVec,

    // Histograms
    pub build_latency: Histogram,
    pub confirm_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let operations_submitted = IntCounterVec::new(
            Opts::new(
                "perps_operations_submitted_total",
                "Signed transactions handed to the transport",
            ),
            &["operation"],
        )?;

        let operations_confirmed = IntCounterVec::new(
            Opts::new(
                "perps_operations_confirmed_total",
                "Transactions observed as finalized",
            ),
            &["operation"],
        )?;

        let diagnoses_total = IntCounterVec::new(
            Opts::new("perps_diagnoses_total", "Failures by diagnosis kind"),
            &["kind"],
        )?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new(
                "perps_build_latency_seconds",
                "Instruction build latency, including account fetches",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;

        let confirm_latency = Histogram::with_opts(
            HistogramOpts::new(
                "perps_confirm_latency_seconds",
                "Time from submission to finality",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0, 60.0, 90.0]),
        )?;

        registry.register(Box::new(operations_submitted.clone()))?;
        registry.register(Box::new(operations_confirmed.clone()))?;
        registry.register(Box::new(diagnoses_total.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(confirm_latency.clone()))?;

        Ok(Self {
            registry,
            operations_submitted,
            operations_confirmed,
            diagnoses_total,
            build_latency,
            confirm_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_diagnosis(&self, diagnosis: &Diagnosis) {
        self.diagnoses_total
            .with_label_values(&[diagnosis.kind.as_str()])
            .inc();
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::DiagnosisKind;

    #[test]
    fn test_metrics_register_and_count() {
        let m = Metrics::new().unwrap();
        m.record_diagnosis(&Diagnosis::new(DiagnosisKind::Unknown, "x"));
        m.record_diagnosis(&Diagnosis::user_cancelled());
        m.record_diagnosis(&Diagnosis::user_cancelled());

        assert_eq!(
            m.diagnoses_total
                .with_label_values(&["user_cancelled"])
                .get(),
            2
        );
    }

    #[test]
    fn test_timer_observes() {
        let m = Metrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&m.build_latency);
        assert_eq!(m.build_latency.get_sample_count(), 1);
    }
}
