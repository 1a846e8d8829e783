use crate::error::{BackendError, EventlyError};
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static REQUEST_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("evently_requests_total"));
pub static BOOKING_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("evently_bookings_total"));
pub static STALE_RESULTS_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("evently_stale_results_discarded_total"));
pub static ADMIN_MODE_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("evently_admin_mode"));

pub fn record_failure(operation: &'static str, err: &BackendError) {
    counter!(
        "evently_request_failures_total",
        "operation" => operation,
        "kind" => err.kind()
    )
    .increment(1);
}

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "evently-client")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(()) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            // Initialize metrics with default values
            REQUEST_COUNTER.absolute(0);
            BOOKING_COUNTER.absolute(0);
            STALE_RESULTS_COUNTER.absolute(0);
            ADMIN_MODE_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(EventlyError::MetricsError(e.to_string()).into())
        }
    }
}
