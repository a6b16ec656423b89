//! DecayPrediction (spec §3, §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecayRecommendation {
    Promote,
    Retain,
    Archive,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayPrediction {
    pub item_id: String,
    pub current_importance: f64,
    pub predicted_importance: f64,
    pub decay_rate: f64,
    /// Estimated days until the item becomes obsolete.
    pub estimated_time_to_obsolescence_days: f64,
    pub confidence: f64,
    pub recommendation: DecayRecommendation,
    pub contributing_factors: Vec<String>,
}
