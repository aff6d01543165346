//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Must be called once at
/// startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants.

/// Join attempts (counter, labels: outcome).
pub const JOINS_TOTAL: &str = "convene_joins_total";
/// Fanout deliveries (counter, labels: result).
pub const DELIVERIES_TOTAL: &str = "convene_deliveries_total";
/// Fanout duration seconds (histogram).
pub const FANOUT_DURATION_SECONDS: &str = "convene_fanout_duration_seconds";
/// WebSocket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "convene_ws_connections_total";
/// WebSocket disconnections (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "convene_ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "convene_ws_connections_active";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = render(&handle);
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_names_are_prefixed_snake_case() {
        let names = [
            JOINS_TOTAL,
            DELIVERIES_TOTAL,
            FANOUT_DURATION_SECONDS,
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
        ];
        for name in names {
            assert!(name.starts_with("convene_"), "metric '{name}' must be prefixed");
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
