//! HTTP server for the dashboard REST API

use crate::api::handlers;
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the API router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ====================================================================
        // Health check
        // ====================================================================
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))

        // ====================================================================
        // Dashboard & metrics
        // ====================================================================
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/metrics/overall", get(handlers::get_overall_metrics))
        .route("/api/v1/metrics/sources", get(handlers::get_source_metrics))
        .route("/api/v1/metrics/content", get(handlers::get_content_metrics))
        .route("/api/v1/metrics/comparison", get(handlers::get_period_comparison))

        // ====================================================================
        // Breakdowns
        // ====================================================================
        .route("/api/v1/spend/daily", get(handlers::get_daily_spend))
        .route("/api/v1/spend/campaigns", get(handlers::get_campaign_performance))
        .route("/api/v1/leads", get(handlers::get_leads))
        .route("/api/v1/leads/daily", get(handlers::get_lead_daily_trend))
        .route("/api/v1/revenue", get(handlers::get_revenue))
        .route("/api/v1/revenue/daily", get(handlers::get_revenue_daily_trend))

        // Cache
        .route("/api/v1/refresh", post(handlers::refresh))

        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
            task: None,
        }
    }

    /// Bind and start serving in the background
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let host = self.state.config.server.host.clone();
        let port = self.state.config.server.port;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address {}:{}: {}", host, port, e)))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let app = router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("Starting marketing dashboard API server on {}", local_addr);

        self.task = Some(tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        }));

        info!("=== Endpoints ===");
        info!("  GET  http://{}/health", local_addr);
        info!("  GET  http://{}/api/v1/dashboard", local_addr);
        info!("  GET  http://{}/api/v1/metrics/{{overall,sources,content,comparison}}", local_addr);
        info!("  GET  http://{}/api/v1/spend/{{daily,campaigns}}", local_addr);
        info!("  GET  http://{}/api/v1/leads[/daily]", local_addr);
        info!("  GET  http://{}/api/v1/revenue[/daily]", local_addr);
        info!("  POST http://{}/api/v1/refresh", local_addr);

        Ok(local_addr)
    }

    /// Signal shutdown and wait for in-flight requests to finish
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("API server task failed: {}", e);
            }
        }
    }

    /// Send the stop signal
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::types::Platform;
    use crate::testing::{seeded_state_with, spend, test_state, FakePlatform};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn seeded_router() -> (tempfile::TempDir, Arc<AppState>) {
        let (dir, state) = seeded_state_with(vec![
            FakePlatform::returning(
                Platform::Google,
                vec![spend(Platform::Google, "2024-03-02", "A", 100.0)],
            ),
            FakePlatform::failing(Platform::Facebook),
        ]);
        (dir, Arc::new(state))
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(test_state(Vec::new())));
        let (status, body) = call(app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn test_content_metrics_endpoint() {
        let (_dir, state) = seeded_router();
        let (status, body) = call(
            router(state),
            "GET",
            "/api/v1/metrics/content?start=2024-03-01&end=2024-03-07",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["source"], "google");
        assert_eq!(rows[0]["content"], "A");
        assert_eq!(rows[0]["cpa"], 50.0);
        assert_eq!(rows[0]["roas"], 3.0);
    }

    #[tokio::test]
    async fn test_source_metrics_are_keyed_by_platform() {
        let (_dir, state) = seeded_router();
        let (status, body) = call(
            router(state),
            "GET",
            "/api/v1/metrics/sources?start=2024-03-01&end=2024-03-07&platforms=google",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_object().unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["google"]);
        assert_eq!(data["google"]["spend"], 100.0);
    }

    #[tokio::test]
    async fn test_invalid_window_is_bad_request() {
        let app = router(Arc::new(test_state(Vec::new())));
        let (status, body) = call(
            app.clone(),
            "GET",
            "/api/v1/metrics/overall?start=2024-03-07&end=2024-03-01",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["data"]["code"], "VALIDATION_ERROR");

        let (status, _) = call(app, "GET", "/api/v1/leads/daily?platforms=apple").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_comparison_with_extreme_years_is_bad_request() {
        let app = router(Arc::new(test_state(Vec::new())));
        let (status, body) = call(
            app.clone(),
            "GET",
            "/api/v1/metrics/comparison?start=-200000-01-01&end=%2B200000-01-01",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["code"], "VALIDATION_ERROR");

        // the window itself is valid but the one before it is not
        let (status, body) = call(
            app,
            "GET",
            "/api/v1/metrics/comparison?start=1900-01-01&end=1900-01-31",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_lead_and_revenue_detail_endpoints() {
        let (_dir, state) = seeded_router();
        let query = "?start=2024-03-01&end=2024-03-07";

        let (status, body) = call(router(state.clone()), "GET", &format!("/api/v1/leads{}", query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"][0]["created_at"], "2024-03-07T18:30:00");

        let (status, body) = call(router(state), "GET", &format!("/api/v1/revenue{}&platforms=google", query)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["member_id"], 1);
        assert_eq!(rows[0]["net_price"], 272.73);
    }

    #[tokio::test]
    async fn test_dashboard_and_refresh() {
        let (_dir, state) = seeded_router();
        let uri = "/api/v1/dashboard?start=2024-03-01&end=2024-03-07";

        let (status, body) = call(router(state.clone()), "GET", uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["overall"]["total_revenue"], 760.0);
        assert_eq!(body["data"]["spend_summary"]["google"]["total_spend"], 100.0);
        assert_eq!(body["data"]["spend_summary"]["facebook"]["total_spend"], 0.0);
        assert_eq!(body["data"]["orders_by_source"]["google"], 2);
        assert_eq!(state.dashboard_cache.len(), 1);

        let (status, body) = call(router(state.clone()), "POST", "/api/v1/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cleared"], 1);
        assert!(state.dashboard_cache.is_empty());
    }

    #[tokio::test]
    async fn test_trend_endpoints() {
        let (_dir, state) = seeded_router();
        let query = "?start=2024-03-01&end=2024-03-07";

        let (status, body) = call(router(state.clone()), "GET", &format!("/api/v1/revenue/daily{}", query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 4);

        let (status, body) = call(router(state.clone()), "GET", &format!("/api/v1/spend/daily{}", query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["date"], "2024-03-02");

        let (status, body) = call(router(state), "GET", &format!("/api/v1/spend/campaigns{}", query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["campaign_name"], "Campaign A");
    }
}
