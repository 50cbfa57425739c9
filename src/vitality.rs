//! Vitality aggregation engine
//!
//! Turns the per-question averages from the answer ledger into the weighted
//! vitality score of the tree. Recomputed fresh on every status request;
//! there is no cache to invalidate.

use serde::Serialize;

use crate::types::Category;

/// Per-question slice of the vitality report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScore {
    pub question_id: i64,
    pub category: Category,
    pub text: String,
    pub weight: f64,
    /// Arithmetic mean of all recorded answers; 0.0 when none exist.
    pub average: f64,
    /// Number of recorded answers.
    pub responses: u64,
}

/// The derived status report. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalityReport {
    /// Distinct users with at least one recorded answer, ever.
    pub participants: u64,
    /// Weighted vitality, rounded to 2 decimals for presentation.
    pub vitality: f64,
    pub breakdown: Vec<QuestionScore>,
}

impl VitalityReport {
    pub fn new(participants: u64, breakdown: Vec<QuestionScore>) -> Self {
        let vitality = round2(weighted_vitality(&breakdown));
        Self {
            participants,
            vitality,
            breakdown,
        }
    }
}

/// Weighted vitality over active questions: Σ(avg·w) / Σ(w).
///
/// An empty registry (or zero total weight) yields 0.0 rather than a
/// division by zero. Full f64 precision; rounding is presentation-only.
pub fn weighted_vitality(scores: &[QuestionScore]) -> f64 {
    let total_weight: f64 = scores.iter().map(|s| s.weight).sum();
    if total_weight == 0.0 {
        return 0.0;
    }

    let weighted_sum: f64 = scores.iter().map(|s| s.average * s.weight).sum();
    weighted_sum / total_weight
}

/// Round to 2 decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
