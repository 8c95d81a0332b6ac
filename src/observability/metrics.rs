use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created_total: IntCounter,
    pub quotes_total: IntCounterVec,
    pub job_accepts_total: IntCounterVec,
    pub job_transitions_total: IntCounterVec,
    pub active_jobs: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bookings_created_total =
            IntCounter::new("bookings_created_total", "Total bookings created")
                .expect("valid bookings_created_total metric");

        let quotes_total = IntCounterVec::new(
            Opts::new("quotes_total", "Pricing quotes computed by vehicle type"),
            &["vehicle_type"],
        )
        .expect("valid quotes_total metric");

        let job_accepts_total = IntCounterVec::new(
            Opts::new("job_accepts_total", "Job acceptance attempts by outcome"),
            &["outcome"],
        )
        .expect("valid job_accepts_total metric");

        let job_transitions_total = IntCounterVec::new(
            Opts::new(
                "job_transitions_total",
                "Booking status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid job_transitions_total metric");

        let active_jobs = IntGauge::new("active_jobs", "Bookings currently held by a driver")
            .expect("valid active_jobs metric");

        registry
            .register(Box::new(bookings_created_total.clone()))
            .expect("register bookings_created_total");
        registry
            .register(Box::new(quotes_total.clone()))
            .expect("register quotes_total");
        registry
            .register(Box::new(job_accepts_total.clone()))
            .expect("register job_accepts_total");
        registry
            .register(Box::new(job_transitions_total.clone()))
            .expect("register job_transitions_total");
        registry
            .register(Box::new(active_jobs.clone()))
            .expect("register active_jobs");

        Self {
            registry,
            bookings_created_total,
            quotes_total,
            job_accepts_total,
            job_transitions_total,
            active_jobs,
        }
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
