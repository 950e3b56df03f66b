use serde::{Deserialize, Serialize};

use crate::fees::CategoryShare;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarketSize {
    Small,
    Medium,
    Large,
    Major,
}

impl MarketSize {
    /// Unknown population is treated as a small market.
    pub fn from_population(population: Option<u64>) -> Self {
        match population {
            Some(p) if p >= 1_000_000 => Self::Major,
            Some(p) if p >= 500_000 => Self::Large,
            Some(p) if p >= 100_000 => Self::Medium,
            _ => Self::Small,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::Major => "Major",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JurisdictionRanking {
    pub jurisdiction_id: String,
    pub jurisdiction_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub population: Option<u64>,
    /// First-year total: one-time fees plus twelve months of recurring charges.
    pub total_fees: f64,
    pub one_time_fees: f64,
    pub annual_operating_costs: f64,
    pub fee_per_unit: Option<f64>,
    pub fee_per_sqft: Option<f64>,
    pub fee_per_dollar: Option<f64>,
    pub market_size: MarketSize,
    pub development_friendly: u8,
    pub economic_viability: u8,
    pub overall_score: f64,
    pub rank: usize,
    pub strengths: Vec<String>,
    pub considerations: Vec<String>,
    pub fee_breakdown: Vec<CategoryShare>,
    /// Matched schedule-based fees left out of `total_fees`.
    pub needs_rules_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    NoApplicableFees,
    DataUnavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedJurisdiction {
    pub jurisdiction_id: String,
    pub jurisdiction_name: String,
    pub reason: ExclusionReason,
}

/// Ranked jurisdictions plus the ones that could not be ranked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingOutcome {
    pub rankings: Vec<JurisdictionRanking>,
    pub excluded: Vec<ExcludedJurisdiction>,
}

/// Envelope returned by the ranking endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<JurisdictionRanking>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub excluded: Vec<ExcludedJurisdiction>,
}

impl RankingResponse {
    pub fn from_outcome(outcome: RankingOutcome) -> Self {
        Self {
            success: true,
            data: Some(outcome.rankings),
            error: None,
            excluded: outcome.excluded,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            excluded: Vec::new(),
        }
    }
}
