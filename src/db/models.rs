//! Backend row models
//!
//! Field names deserialize from the backend's column names and serialize in
//! snake_case for API consumers.

use crate::platforms::types::Platform;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Leads
// ============================================================================

/// A single lead form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDetail {
    #[serde(rename(deserialize = "MemberId"))]
    pub member_id: i64,
    #[serde(rename(deserialize = "UtmSource"))]
    pub source: Platform,
    #[serde(rename(deserialize = "UtmMedium"))]
    pub utm_medium: String,
    #[serde(rename(deserialize = "UtmTerm"))]
    pub utm_term: String,
    #[serde(rename(deserialize = "UtmContent"))]
    pub utm_content: String,
    #[serde(rename(deserialize = "CreateDate"))]
    pub created_at: NaiveDateTime,
}

/// Distinct leads for one attribution key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(rename(deserialize = "UtmSource"))]
    pub source: Platform,
    #[serde(rename(deserialize = "UtmContent"))]
    pub utm_content: String,
    #[serde(rename(deserialize = "LeadCount"))]
    pub lead_count: i64,
    #[serde(rename(deserialize = "FirstLeadDate"), default)]
    pub first_lead_date: Option<NaiveDate>,
    #[serde(rename(deserialize = "LastLeadDate"), default)]
    pub last_lead_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDailyTrend {
    #[serde(rename(deserialize = "Date"))]
    pub date: NaiveDate,
    #[serde(rename(deserialize = "UtmSource"))]
    pub source: Platform,
    #[serde(rename(deserialize = "LeadCount"))]
    pub lead_count: i64,
}

// ============================================================================
// Revenue
// ============================================================================

/// A paid new-sale order attributed to its member's latest lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueDetail {
    #[serde(rename(deserialize = "MemberId"))]
    pub member_id: i64,
    #[serde(rename(deserialize = "UtmSource"))]
    pub source: Platform,
    #[serde(rename(deserialize = "UtmMedium"))]
    pub utm_medium: String,
    #[serde(rename(deserialize = "UtmContent"))]
    pub utm_content: String,
    #[serde(rename(deserialize = "StudentName"), default)]
    pub student_name: Option<String>,
    #[serde(rename(deserialize = "StudentNo"), default)]
    pub student_no: Option<String>,
    #[serde(rename(deserialize = "Product"), default)]
    pub product: Option<String>,
    #[serde(rename(deserialize = "Price"), default)]
    pub price: Option<f64>,
    #[serde(rename(deserialize = "TotalPrice"))]
    pub total_price: f64,
    #[serde(rename(deserialize = "NetPrice"))]
    pub net_price: f64,
    #[serde(rename(deserialize = "OrderDate"))]
    pub order_date: NaiveDate,
}

/// Orders and revenue for one attribution key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    #[serde(rename(deserialize = "UtmSource"))]
    pub source: Platform,
    #[serde(rename(deserialize = "UtmContent"))]
    pub utm_content: String,
    #[serde(rename(deserialize = "OrderCount"))]
    pub order_count: i64,
    #[serde(rename(deserialize = "TotalRevenue"))]
    pub total_revenue: f64,
    #[serde(rename(deserialize = "NetRevenue"))]
    pub net_revenue: f64,
    #[serde(rename(deserialize = "AvgOrderValue"))]
    pub avg_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueDailyTrend {
    #[serde(rename(deserialize = "Date"))]
    pub date: NaiveDate,
    #[serde(rename(deserialize = "UtmSource"))]
    pub source: Platform,
    #[serde(rename(deserialize = "TotalRevenue"))]
    pub total_revenue: f64,
    #[serde(rename(deserialize = "OrderCount"))]
    pub order_count: i64,
}
