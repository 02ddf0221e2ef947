//! Prometheus exposition for the `metrics` facade.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global recorder. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    metrics::describe_counter!("invoices_created_total", "Invoices appended to a user ledger");
    metrics::describe_counter!("invoices_captured_total", "Invoices marked paid after capture");
    metrics::describe_counter!(
        "invoice_amount_mismatch_total",
        "Captures rejected because the paid amount differed from the invoice total"
    );
    metrics::describe_counter!("invoices_cancelled_total", "Invoices cancelled and archived");
    metrics::describe_counter!("authz_denied_total", "Requests denied by the permission evaluator");

    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}
