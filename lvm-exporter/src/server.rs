// SPDX-License-Identifier: GPL-3.0-only

//! HTTP exposition of LVM metrics
//!
//! Every scrape re-runs the three listings on blocking workers, one after
//! another. A failed listing is logged and reported through the collector
//! success gauge; the others still contribute their samples.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use lvm_sys::{CommandRunner, LvmInventory};
use lvm_types::EntityKind;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::metrics::LvmMetrics;

struct AppState<R> {
    inventory: Arc<LvmInventory<R>>,
    telemetry_path: String,
}

pub fn router<R: CommandRunner + 'static>(
    inventory: LvmInventory<R>,
    telemetry_path: &str,
) -> Router {
    let state = Arc::new(AppState {
        inventory: Arc::new(inventory),
        telemetry_path: telemetry_path.to_string(),
    });

    Router::new()
        .route("/", get(landing_page::<R>))
        .route(telemetry_path, get(metrics::<R>))
        .with_state(state)
}

/// Serve until SIGINT or SIGTERM
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {error}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!("Failed to listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}

async fn landing_page<R>(State(state): State<Arc<AppState<R>>>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>LVM Exporter</title></head>\n<body>\n\
         <h1>LVM Exporter</h1>\n<p><a href=\"{path}\">Metrics</a></p>\n</body>\n</html>\n",
        path = state.telemetry_path
    ))
}

async fn metrics<R: CommandRunner + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Response {
    match scrape(&state.inventory).await {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(error) => {
            error!("Failed to render metrics: {error:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{error:#}\n")).into_response()
        }
    }
}

/// Run all listings and render them into a fresh registry
pub async fn scrape<R: CommandRunner + 'static>(inventory: &Arc<LvmInventory<R>>) -> Result<String> {
    let metrics = LvmMetrics::new().context("failed to register metric families")?;

    if let Some(groups) = collect(&metrics, inventory, EntityKind::VolumeGroup, |inventory| {
        inventory.list_volume_groups()
    })
    .await?
    {
        metrics.observe_volume_groups(&groups);
    }

    if let Some(volumes) = collect(&metrics, inventory, EntityKind::LogicalVolume, |inventory| {
        inventory.list_logical_volumes()
    })
    .await?
    {
        metrics.observe_logical_volumes(&volumes);
    }

    if let Some(volumes) = collect(&metrics, inventory, EntityKind::PhysicalVolume, |inventory| {
        inventory.list_physical_volumes()
    })
    .await?
    {
        metrics.observe_physical_volumes(&volumes);
    }

    metrics.render().context("failed to encode metrics")
}

/// Run one listing on a blocking worker and record its outcome
///
/// Returns `None` when the listing failed; only a panicked worker is an error.
async fn collect<R, T, F>(
    metrics: &LvmMetrics,
    inventory: &Arc<LvmInventory<R>>,
    kind: EntityKind,
    list: F,
) -> Result<Option<Vec<T>>>
where
    R: CommandRunner + 'static,
    T: Send + 'static,
    F: FnOnce(&LvmInventory<R>) -> lvm_sys::Result<Vec<T>> + Send + 'static,
{
    let inventory = Arc::clone(inventory);
    let started = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || list(&inventory))
        .await
        .with_context(|| format!("{kind} listing task failed"))?;
    let elapsed = started.elapsed();

    match outcome {
        Ok(records) => {
            debug!("Listed {} {kind}(s) in {}", records.len(), format_elapsed(elapsed));
            metrics.observe_collector(kind, true, elapsed);
            Ok(Some(records))
        }
        Err(error) => {
            error!("Failed to list {kind}s: {error}");
            metrics.observe_collector(kind, false, elapsed);
            Ok(None)
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;

    use lvm_sys::{CommandOutput, ExecutionFailure, InventoryOptions, LvmError};

    use super::*;

    /// Answers each command with canned stdout; unknown commands fail to spawn
    #[derive(Default)]
    struct CannedRunner {
        outputs: HashMap<&'static str, String>,
    }

    impl CannedRunner {
        fn with(mut self, command: &'static str, stdout: serde_json::Value) -> Self {
            self.outputs.insert(command, stdout.to_string());
            self
        }
    }

    impl CommandRunner for CannedRunner {
        fn run(&self, command: &str, args: &[&str]) -> lvm_sys::Result<CommandOutput> {
            match self.outputs.get(command) {
                Some(stdout) => Ok(CommandOutput {
                    stdout: stdout.clone().into_bytes(),
                    stderr: Vec::new(),
                }),
                None => Err(LvmError::Execution {
                    command: command.to_string(),
                    args: args.iter().map(ToString::to_string).collect(),
                    reason: ExecutionFailure::Spawn(io::Error::from(io::ErrorKind::NotFound)),
                }),
            }
        }
    }

    fn vgs_report() -> serde_json::Value {
        serde_json::json!({
            "report": [{
                "vg": [{
                    "vg_name": "vg0", "vg_uuid": "u1",
                    "vg_size": "1000B", "vg_free": "400B",
                    "vg_mda_size": "0B", "vg_mda_free": "0B",
                    "pv_count": "1", "lv_count": "0", "max_lv": "0", "max_pv": "0",
                    "snap_count": "0", "vg_missing_pv_count": "0",
                    "vg_mda_count": "0", "vg_mda_used_count": "0",
                    "vg_permissions": "writeable", "vg_allocation_policy": "normal"
                }]
            }]
        })
    }

    fn pvs_report() -> serde_json::Value {
        serde_json::json!({
            "report": [{
                "pv": [{
                    "pv_name": "/dev/sda2", "pv_uuid": "p1", "vg_name": "vg0",
                    "pv_allocatable": "allocatable", "pv_missing": "", "pv_in_use": "used",
                    "pv_size": "1000B", "pv_free": "400B", "dev_size": "1048576B",
                    "pv_mda_size": "1044480B", "pv_mda_free": "517120B"
                }]
            }]
        })
    }

    fn inventory(runner: CannedRunner) -> Arc<LvmInventory<CannedRunner>> {
        Arc::new(LvmInventory::new(runner, InventoryOptions::default()))
    }

    #[tokio::test]
    async fn failed_listing_keeps_other_samples() {
        let runner = CannedRunner::default()
            .with("vgs", vgs_report())
            .with("pvs", pvs_report());

        let text = scrape(&inventory(runner)).await.unwrap();

        assert!(text.contains("lvm_vg_used_size_bytes{name=\"vg0\"} 600"));
        assert!(text.contains("lvm_pv_mda_free_size_bytes{"));
        assert!(text.contains("lvm_exporter_collector_success{collector=\"vg\"} 1"));
        assert!(text.contains("lvm_exporter_collector_success{collector=\"lv\"} 0"));
        assert!(text.contains("lvm_exporter_collector_success{collector=\"pv\"} 1"));
        assert!(!text.contains("lvm_lv_total_size_bytes"));
    }

    #[tokio::test]
    async fn malformed_report_marks_collector_failed() {
        let runner = CannedRunner::default()
            .with("vgs", serde_json::json!({"report": []}))
            .with("lvs", serde_json::json!({"report": [{"lv": []}]}))
            .with("pvs", pvs_report());

        let text = scrape(&inventory(runner)).await.unwrap();

        assert!(text.contains("lvm_exporter_collector_success{collector=\"vg\"} 0"));
        assert!(text.contains("lvm_exporter_collector_success{collector=\"lv\"} 1"));
        assert!(!text.contains("lvm_vg_total_bytes"));
    }

    #[tokio::test]
    async fn serves_metrics_and_landing_page() {
        let runner = CannedRunner::default().with("vgs", vgs_report());
        let app = router(LvmInventory::new(runner, InventoryOptions::default()), "/probe");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let landing = http_get(address, "/").await;
        assert!(landing.starts_with("HTTP/1.1 200"));
        assert!(landing.contains("<a href=\"/probe\">"));

        let metrics = http_get(address, "/probe").await;
        assert!(metrics.starts_with("HTTP/1.1 200"));
        assert!(metrics.contains("text/plain; version=0.0.4"));
        assert!(metrics.contains("lvm_vg_total_bytes{name=\"vg0\"} 1000"));

        let missing = http_get(address, "/metrics").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
    }

    async fn http_get(address: std::net::SocketAddr, path: &str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = tokio::net::TcpStream::connect(address).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }
}
