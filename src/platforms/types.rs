//! Common ad platform types

use crate::error::AppError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Platform
// ============================================================================

/// Supported advertising platforms
///
/// `as_str()` is the exact `UtmSource` literal recorded by the backend for
/// traffic from that platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Google,
    Facebook,
}

impl Platform {
    /// Every platform with a connector, in display order
    pub const ALL: [Platform; 2] = [Platform::Google, Platform::Facebook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Google => "google",
            Platform::Facebook => "facebook",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Google => "Google Ads",
            Platform::Facebook => "Facebook Ads",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Platform::Google),
            "facebook" => Ok(Platform::Facebook),
            other => Err(AppError::Validation(format!("Unsupported platform: '{}'", other))),
        }
    }
}

/// Parse a comma-separated platform list, skipping blanks and duplicates
pub fn parse_platform_list(raw: &str) -> Result<Vec<Platform>, AppError> {
    let mut platforms = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let platform: Platform = part.parse()?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    Ok(platforms)
}

// ============================================================================
// Spend Records
// ============================================================================

/// One day of spend for one campaign (or ad) on one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub date: NaiveDate,
    pub source: Platform,
    pub campaign_id: String,
    pub campaign_name: String,
    pub utm_content: String,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
}

/// Spend totals over a set of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendSummary {
    pub total_spend: f64,
    pub total_clicks: i64,
    pub total_impressions: i64,
    pub total_conversions: i64,
}

impl SpendSummary {
    pub fn from_records(records: &[SpendRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.total_spend += r.spend;
            acc.total_clicks += r.clicks;
            acc.total_impressions += r.impressions;
            acc.total_conversions += r.conversions;
            acc
        })
    }
}

// ============================================================================
// Lenient Deserializers
// ============================================================================
//
// Ad platform REST APIs encode int64 and decimal metrics as JSON strings
// ("spend": "12.34", "costMicros": "1200000"), so numbers are accepted in
// either form. Empty strings count as zero.

pub(crate) fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        Str(String),
    }

    match FlexibleInt::deserialize(deserializer)? {
        FlexibleInt::Int(i) => Ok(i),
        FlexibleInt::Float(f) => Ok(f as i64),
        FlexibleInt::Str(s) if s.trim().is_empty() => Ok(0),
        FlexibleInt::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFloat {
        Float(f64),
        Int(i64),
        Str(String),
    }

    match FlexibleFloat::deserialize(deserializer)? {
        FlexibleFloat::Float(f) => Ok(f),
        FlexibleFloat::Int(i) => Ok(i as f64),
        FlexibleFloat::Str(s) if s.trim().is_empty() => Ok(0.0),
        FlexibleFloat::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Accepts a string or a bare number and yields its text form
pub(crate) fn deserialize_flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleString {
        Str(String),
        Int(i64),
    }

    match FlexibleString::deserialize(deserializer)? {
        FlexibleString::Str(s) => Ok(s),
        FlexibleString::Int(i) => Ok(i.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: Platform, spend: f64, clicks: i64) -> SpendRecord {
        SpendRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            source,
            campaign_id: "1".to_string(),
            campaign_name: "Spring".to_string(),
            utm_content: "spring".to_string(),
            spend,
            impressions: clicks * 10,
            clicks,
            conversions: 1,
        }
    }

    #[test]
    fn test_platform_parse_is_case_insensitive() {
        assert_eq!(" Google ".parse::<Platform>().unwrap(), Platform::Google);
        assert_eq!("FACEBOOK".parse::<Platform>().unwrap(), Platform::Facebook);
        assert!("apple".parse::<Platform>().is_err());
    }

    #[test]
    fn test_parse_platform_list_dedupes() {
        let list = parse_platform_list("google, facebook,,google").unwrap();
        assert_eq!(list, vec![Platform::Google, Platform::Facebook]);
        assert!(parse_platform_list("").unwrap().is_empty());
        assert!(parse_platform_list("google,tiktok").is_err());
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        let json = serde_json::to_string(&Platform::Facebook).unwrap();
        assert_eq!(json, "\"facebook\"");
    }

    #[test]
    fn test_spend_summary_totals() {
        let records = vec![
            record(Platform::Google, 10.5, 3),
            record(Platform::Facebook, 4.5, 2),
        ];
        let summary = SpendSummary::from_records(&records);
        assert_eq!(summary.total_spend, 15.0);
        assert_eq!(summary.total_clicks, 5);
        assert_eq!(summary.total_impressions, 50);
        assert_eq!(summary.total_conversions, 2);
        assert_eq!(SpendSummary::from_records(&[]), SpendSummary::default());
    }

    #[test]
    fn test_flexible_numbers_accept_strings() {
        #[derive(Deserialize)]
        struct Metrics {
            #[serde(deserialize_with = "deserialize_flexible_i64")]
            clicks: i64,
            #[serde(deserialize_with = "deserialize_flexible_f64")]
            spend: f64,
            #[serde(deserialize_with = "deserialize_flexible_string")]
            id: String,
        }

        let m: Metrics =
            serde_json::from_str(r#"{"clicks": "42", "spend": "12.34", "id": 99}"#).unwrap();
        assert_eq!(m.clicks, 42);
        assert_eq!(m.spend, 12.34);
        assert_eq!(m.id, "99");

        let m: Metrics = serde_json::from_str(r#"{"clicks": 7, "spend": 3, "id": "x"}"#).unwrap();
        assert_eq!(m.clicks, 7);
        assert_eq!(m.spend, 3.0);

        let m: Metrics = serde_json::from_str(r#"{"clicks": "", "spend": "", "id": ""}"#).unwrap();
        assert_eq!(m.clicks, 0);
        assert_eq!(m.spend, 0.0);
    }
}
