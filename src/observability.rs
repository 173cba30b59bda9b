use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total resolutions performed. Labels: outcome (hit/unknown).
pub const RESOLUTIONS_TOTAL: &str = "billet_resolutions_total";

/// Counter: total mutations applied. Labels: op.
pub const MUTATIONS_TOTAL: &str = "billet_mutations_total";

/// Counter: override add/modify attempts rejected by the schedule checker.
pub const CONFLICTS_TOTAL: &str = "billet_conflicts_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: host moves realized through the provisioning backend.
pub const MOVES_TOTAL: &str = "billet_moves_total";

/// Histogram: store persist duration in seconds.
pub const PERSIST_DURATION_SECONDS: &str = "billet_persist_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
