//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Submission counters
    pub submissions_total: IntCounter,
    pub submissions_success: IntCounter,
    pub submissions_failed: IntCounter,
    pub submission_retries: IntCounter,
    pub send_timeouts: IntCounter,

    // Verification counters
    pub verification_polls: IntCounter,
    pub recovered_by_verification: IntCounter,
    pub final_lookups: IntCounter,
    pub recovered_by_final_lookup: IntCounter,

    // Session counters
    pub attempts_blocked: IntCounter,

    // Histograms
    pub submission_latency: Histogram,
    pub send_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "swap_submissions_total",
            "Logical transactions handed to the orchestrator",
        ))?;

        let submissions_success = IntCounter::with_opts(Opts::new(
            "swap_submissions_success",
            "Submissions that ended with a ledger-confirmed transaction",
        ))?;

        let submissions_failed = IntCounter::with_opts(Opts::new(
            "swap_submissions_failed",
            "Submissions that ended in failure",
        ))?;

        let submission_retries = IntCounter::with_opts(Opts::new(
            "swap_submission_retries",
            "Retries performed after an ambiguous failure",
        ))?;

        let send_timeouts = IntCounter::with_opts(Opts::new(
            "swap_send_timeouts",
            "Sends that were not acknowledged within the send timeout",
        ))?;

        let verification_polls = IntCounter::with_opts(Opts::new(
            "swap_verification_polls",
            "Ledger polls issued by the confirmation verifier",
        ))?;

        let recovered_by_verification = IntCounter::with_opts(Opts::new(
            "swap_recovered_by_verification",
            "Ambiguous failures the verifier found had landed",
        ))?;

        let final_lookups = IntCounter::with_opts(Opts::new(
            "swap_final_lookups",
            "Authoritative ledger lookups made before reporting failure",
        ))?;

        let recovered_by_final_lookup = IntCounter::with_opts(Opts::new(
            "swap_recovered_by_final_lookup",
            "Failures overturned by the final ledger lookup",
        ))?;

        let attempts_blocked = IntCounter::with_opts(Opts::new(
            "swap_attempts_blocked",
            "Submissions rejected by the transaction state tracker",
        ))?;

        let submission_latency = Histogram::with_opts(
            HistogramOpts::new("swap_submission_latency_seconds", "End-to-end execute latency")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        let send_latency = Histogram::with_opts(
            HistogramOpts::new("swap_send_latency_seconds", "Send acknowledgment latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )?;

        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_success.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(submission_retries.clone()))?;
        registry.register(Box::new(send_timeouts.clone()))?;
        registry.register(Box::new(verification_polls.clone()))?;
        registry.register(Box::new(recovered_by_verification.clone()))?;
        registry.register(Box::new(final_lookups.clone()))?;
        registry.register(Box::new(recovered_by_final_lookup.clone()))?;
        registry.register(Box::new(attempts_blocked.clone()))?;
        registry.register(Box::new(submission_latency.clone()))?;
        registry.register(Box::new(send_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_success,
            submissions_failed,
            submission_retries,
            send_timeouts,
            verification_polls,
            recovered_by_verification,
            final_lookups,
            recovered_by_final_lookup,
            attempts_blocked,
            submission_latency,
            send_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Render the global registry in the Prometheus text format
pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics().registry().gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
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
        histogram.observe(self.start.elapsed().as_secs_f64());
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

    #[test]
    fn test_counters_increment() {
        let m = metrics();
        let before = m.final_lookups.get();
        m.final_lookups.inc();
        assert!(m.final_lookups.get() > before);
    }

    #[test]
    fn test_render_contains_registered_families() {
        metrics().submissions_total.inc();
        let text = render().unwrap();
        assert!(text.contains("swap_submissions_total"));
    }
}
