//! REST API endpoint handlers
//!
//! Every GET handler resolves the request window and platform filter, then
//! delegates to the services layer.

use crate::api::types::*;
use crate::db::models::{LeadDailyTrend, LeadDetail, RevenueDailyTrend, RevenueDetail};
use crate::platforms::types::Platform;
use crate::services::metrics_service::{format_currency, format_percentage};
use crate::services::{
    AdSpendService, CampaignPerformance, DailySpend, DashboardSummary, LeadService,
    MetricsService, OverallMetrics, PeriodComparison, ReconciledMetric, RevenueService,
    SourceMetrics,
};
use crate::state::AppState;
use axum::extract::{Json, Query, State};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint - GET /health
pub async fn health_check() -> Json<ApiResponse<Empty>> {
    Json(ApiResponse::success_with_message("Marketing dashboard API is running"))
}

// ============================================================================
// Dashboard & Metrics
// ============================================================================

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<DashboardSummary> {
    let (window, platforms) = query.resolve(&state)?;
    info!("Dashboard request for {} ({} platforms)", window, platforms.len());

    let summary = MetricsService::get_dashboard_summary(&state, &window, &platforms).await;
    info!(
        "Dashboard {}: spend {}, revenue {}, ROAS {}",
        window,
        format_currency(summary.overall.total_spend),
        format_currency(summary.overall.total_revenue),
        format_percentage(summary.overall.roas_percentage)
    );
    Ok(Json(ApiResponse::success_with_data(summary)))
}

/// GET /api/v1/metrics/overall
pub async fn get_overall_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<OverallMetrics> {
    let (window, platforms) = query.resolve(&state)?;
    let metrics = MetricsService::calculate_overall_metrics(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(metrics)))
}

/// GET /api/v1/metrics/sources
pub async fn get_source_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<BTreeMap<Platform, SourceMetrics>> {
    let (window, platforms) = query.resolve(&state)?;
    let metrics = MetricsService::calculate_metrics_by_source(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(metrics)))
}

/// GET /api/v1/metrics/content
pub async fn get_content_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<ReconciledMetric>> {
    let (window, platforms) = query.resolve(&state)?;
    let metrics = MetricsService::calculate_metrics_by_content(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(metrics)))
}

/// GET /api/v1/metrics/comparison
pub async fn get_period_comparison(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<PeriodComparison> {
    let (window, platforms) = query.resolve(&state)?;
    let comparison =
        MetricsService::calculate_period_comparison(&state, &window, &platforms).await?;
    Ok(Json(ApiResponse::success_with_data(comparison)))
}

// ============================================================================
// Breakdowns
// ============================================================================

/// GET /api/v1/spend/daily
pub async fn get_daily_spend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<DailySpend>> {
    let (window, platforms) = query.resolve(&state)?;
    let records = AdSpendService::get_all_platform_data(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(
        AdSpendService::get_daily_spend(&records),
    )))
}

/// GET /api/v1/spend/campaigns
pub async fn get_campaign_performance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<CampaignPerformance>> {
    let (window, platforms) = query.resolve(&state)?;
    let records = AdSpendService::get_all_platform_data(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(
        AdSpendService::get_campaign_performance(&records),
    )))
}

/// GET /api/v1/leads
pub async fn get_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<LeadDetail>> {
    let (window, platforms) = query.resolve(&state)?;
    let leads = LeadService::get_leads(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(leads)))
}

/// GET /api/v1/leads/daily
pub async fn get_lead_daily_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<LeadDailyTrend>> {
    let (window, platforms) = query.resolve(&state)?;
    let trend = LeadService::get_lead_daily_trend(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(trend)))
}

/// GET /api/v1/revenue
pub async fn get_revenue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<RevenueDetail>> {
    let (window, platforms) = query.resolve(&state)?;
    let revenue = RevenueService::get_revenue(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(revenue)))
}

/// GET /api/v1/revenue/daily
pub async fn get_revenue_daily_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<RevenueDailyTrend>> {
    let (window, platforms) = query.resolve(&state)?;
    let trend = RevenueService::get_revenue_daily_trend(&state, &window, &platforms).await;
    Ok(Json(ApiResponse::success_with_data(trend)))
}

// ============================================================================
// Cache
// ============================================================================

/// POST /api/v1/refresh
pub async fn refresh(State(state): State<Arc<AppState>>) -> ApiResult<RefreshResult> {
    let cleared = MetricsService::refresh(&state);
    let refreshed_at = (*state.last_refreshed.read()).unwrap_or_else(chrono::Utc::now);

    Ok(Json(ApiResponse {
        status: "success".to_string(),
        message: Some("Dashboard cache cleared".to_string()),
        data: Some(RefreshResult {
            cleared,
            refreshed_at,
        }),
    }))
}
