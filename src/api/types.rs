//! REST API types

use crate::error::{AppError, ErrorResponse, Result};
use crate::platforms::types::{parse_platform_list, Platform};
use crate::state::AppState;
use crate::window::{parse_date, today_in, DatePreset, DateWindow};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard API response envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            data: None,
        }
    }

    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
        }
    }
}

/// Empty payload for message-only responses
#[derive(Debug, Clone, Serialize)]
pub struct Empty {}

/// Result of a cache refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub cleared: usize,
    pub refreshed_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Query Window
// ============================================================================

/// Window and platform selection shared by every GET endpoint
///
/// `start`/`end` are `YYYY-MM-DD` and must be given together; `preset`
/// defaults to `custom`, which falls back to the configured default range
/// when no explicit bounds are given. `platforms` is comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowQuery {
    pub preset: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub platforms: Option<String>,
}

impl WindowQuery {
    pub fn resolve(&self, state: &AppState) -> Result<(DateWindow, Vec<Platform>)> {
        let custom = match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) => Some((parse_date(start)?, parse_date(end)?)),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "start and end must be given together".to_string(),
                ))
            }
        };

        let preset = match self.preset.as_deref() {
            Some(raw) => raw.parse()?,
            None => DatePreset::Custom,
        };

        let window = preset.resolve(
            today_in(state.config.dashboard.timezone),
            custom,
            state.config.dashboard.default_range_days,
        )?;

        let requested = match self.platforms.as_deref() {
            Some(raw) => parse_platform_list(raw)?,
            None => Vec::new(),
        };

        Ok((window, state.select_platforms(&requested)?))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error returned from API handlers
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiResponse {
            status: "error".to_string(),
            message: Some(self.0.to_string()),
            data: Some(ErrorResponse::from(self.0)),
        };

        (status, Json(body)).into_response()
    }
}
