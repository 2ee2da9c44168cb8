//! Sensitivity verdicts and moderation findings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canned reason used when no specific reason was produced.
pub const PASSED_ALL_CHECKS: &str = "Content passed all safety checks";

/// Final safe/flagged decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityStatus {
    Safe,
    Flagged,
}

impl SensitivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityStatus::Safe => "safe",
            SensitivityStatus::Flagged => "flagged",
        }
    }
}

impl fmt::Display for SensitivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the verdict was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMethod {
    /// External content-moderation service findings
    ExternalModeration,
    /// Keyword/heuristic fallback
    HeuristicFallback,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::ExternalModeration => "external-moderation",
            AnalysisMethod::HeuristicFallback => "heuristic-fallback",
        }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The classifier's verdict for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    /// Safe or flagged
    pub status: SensitivityStatus,
    /// Confidence in [0, 1], rounded to two decimals
    pub confidence: f64,
    /// Human-readable reasons; never empty
    pub reasons: Vec<String>,
    /// Method that produced the verdict
    pub analysis_method: AnalysisMethod,
    /// When the verdict was produced
    pub analyzed_at: DateTime<Utc>,
}

impl SensitivityResult {
    /// Build a result, enforcing the never-empty-reasons and rounded
    /// confidence invariants.
    pub fn new(
        status: SensitivityStatus,
        confidence: f64,
        reasons: Vec<String>,
        analysis_method: AnalysisMethod,
    ) -> Self {
        let reasons = if reasons.is_empty() {
            vec![PASSED_ALL_CHECKS.to_string()]
        } else {
            reasons
        };
        Self {
            status,
            confidence: round2(confidence),
            reasons,
            analysis_method,
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.status == SensitivityStatus::Flagged
    }
}

/// One category/confidence finding from the external moderation service.
///
/// Transient: produced by the moderation client, consumed only by the
/// classifier. Confidence is expressed 0-100 as the service reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationFinding {
    /// Parent category name (e.g. "Explicit Nudity")
    pub category: String,
    /// Specific sub-label (e.g. "Graphic Nudity")
    pub label: String,
    /// Confidence percentage, 0-100
    pub confidence: f64,
}

impl ModerationFinding {
    pub fn new(category: impl Into<String>, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
            confidence,
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
