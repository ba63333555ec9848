use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignment_transitions_total: IntCounterVec,
    pub sweep_runs_total: IntCounter,
    pub sweep_duration_seconds: Histogram,
    pub candidate_search_seconds: HistogramVec,
    pub notification_failures_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignment_transitions_total = IntCounterVec::new(
            Opts::new(
                "assignment_transitions_total",
                "Assignment lifecycle transitions by kind",
            ),
            &["transition"],
        )
        .expect("valid assignment_transitions_total metric");

        let sweep_runs_total = IntCounter::new("sweep_runs_total", "Completed expiry sweeps")
            .expect("valid sweep_runs_total metric");

        let sweep_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "sweep_duration_seconds",
            "Duration of expiry sweeps in seconds",
        ))
        .expect("valid sweep_duration_seconds metric");

        let candidate_search_seconds = HistogramVec::new(
            HistogramOpts::new(
                "candidate_search_seconds",
                "Latency of photographer candidate searches in seconds",
            ),
            &["outcome"],
        )
        .expect("valid candidate_search_seconds metric");

        let notification_failures_total = IntCounter::new(
            "notification_failures_total",
            "Notifications dropped after exhausting retries",
        )
        .expect("valid notification_failures_total metric");

        registry
            .register(Box::new(assignment_transitions_total.clone()))
            .expect("register assignment_transitions_total");
        registry
            .register(Box::new(sweep_runs_total.clone()))
            .expect("register sweep_runs_total");
        registry
            .register(Box::new(sweep_duration_seconds.clone()))
            .expect("register sweep_duration_seconds");
        registry
            .register(Box::new(candidate_search_seconds.clone()))
            .expect("register candidate_search_seconds");
        registry
            .register(Box::new(notification_failures_total.clone()))
            .expect("register notification_failures_total");

        Self {
            registry,
            assignment_transitions_total,
            sweep_runs_total,
            sweep_duration_seconds,
            candidate_search_seconds,
            notification_failures_total,
        }
    }

    pub fn record_transition(&self, transition: &str) {
        self.assignment_transitions_total
            .with_label_values(&[transition])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
