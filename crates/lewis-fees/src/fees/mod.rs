//! Fee applicability, calculation, aggregation, and reporting.

pub mod applicability;
pub mod breakdown;
pub mod domain;
pub mod engine;
pub mod format;
pub mod meter;
pub mod rate;
pub mod report;
pub mod router;
pub mod service;
pub mod sql;

#[cfg(test)]
mod tests;

pub use applicability::{is_applicable, select_applicable, EvaluationContext};
pub use breakdown::{
    aggregate, CategoryShare, DataStatus, FeeBreakdown, FeeTotals, ProjectionPolicy,
};
pub use domain::{
    CalculatedFee, FeeBasis, FeeRule, NeedsRulesFee, ProjectDetails, ProjectInputs, ProjectType,
    Provenance, RawRate, SkipReason, SkippedFee, CITYWIDE,
};
pub use engine::{calculate, evaluate, evaluate_all, Evaluation, FeeOutcome};
pub use meter::meter_multiplier;
pub use rate::parse_rate;
pub use report::format_feasibility_report;
pub use router::fee_router;
pub use service::{build_breakdown, FeeCalculatorService, FeeServiceError, SqlEquivalentRequest};
pub use sql::{calc_project_fees, CalcProjectFeesParams, CalcProjectFeesResult};
