//! Performance metrics extracted from a Lighthouse JSON report.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Lighthouse audit ids for the five tracked metrics.
pub const FCP_AUDIT: &str = "first-contentful-paint";
pub const LCP_AUDIT: &str = "largest-contentful-paint";
pub const TBT_AUDIT: &str = "total-blocking-time";
pub const CLS_AUDIT: &str = "cumulative-layout-shift";
pub const TTI_AUDIT: &str = "interactive";

/// Core metrics of one region's audit.
///
/// Timings are milliseconds; `cls` is a unitless score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditMetrics {
    pub fcp: f64,
    pub lcp: f64,
    pub cls: f64,
    pub tbt: f64,
    pub tti: f64,
    /// Overall performance category score (0..1), when Lighthouse reports one.
    #[serde(default)]
    pub score: Option<f64>,
}

impl AuditMetrics {
    /// Parse the raw JSON report and extract the metrics.
    pub fn from_report_json(raw: &str) -> AppResult<Self> {
        let report: JsonValue = serde_json::from_str(raw)
            .map_err(|e| AppError::Audit(format!("Report is not valid JSON: {}", e)))?;
        Self::from_report(&report)
    }

    /// Extract the metrics from a parsed Lighthouse report.
    pub fn from_report(report: &JsonValue) -> AppResult<Self> {
        let audits = report
            .get("audits")
            .ok_or_else(|| AppError::Audit("Report has no audits section".to_string()))?;

        let numeric = |id: &str| -> AppResult<f64> {
            audits
                .get(id)
                .and_then(|audit| audit.get("numericValue"))
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| AppError::Audit(format!("Report is missing metric '{}'", id)))
        };

        let score = report
            .pointer("/categories/performance/score")
            .and_then(JsonValue::as_f64);

        Ok(Self {
            fcp: numeric(FCP_AUDIT)?,
            lcp: numeric(LCP_AUDIT)?,
            cls: numeric(CLS_AUDIT)?,
            tbt: numeric(TBT_AUDIT)?,
            tti: numeric(TTI_AUDIT)?,
            score,
        })
    }
}
