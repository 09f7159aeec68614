//! Prometheus recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Relay sessions rejected at the connection limit (counter).
pub const CONNECTIONS_REJECTED_TOTAL: &str = "comms_node_connections_rejected_total";
/// Envelopes bounced as undeliverable (counter).
pub const UNDELIVERABLE_TOTAL: &str = "comms_node_undeliverable_total";

/// Install the global Prometheus recorder.
///
/// Returns the handle used to render `/metrics`. Call once at startup, before
/// any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format, or an empty body without a recorder.
pub fn render(handle: Option<&PrometheusHandle>) -> String {
    handle.map(PrometheusHandle::render).unwrap_or_default()
}
