//! Jurisdiction ranking by development-friendliness and economic viability.

mod insights;
pub mod router;
pub mod scoring;
pub mod service;
pub mod views;

pub use router::{ranking_router, RankRequest};
pub use service::{
    annualized_category_shares, rank_fetched, score_jurisdiction, FetchedJurisdiction,
    RankingError, RankingService,
};
pub use views::{
    ExcludedJurisdiction, ExclusionReason, JurisdictionRanking, MarketSize, RankingOutcome,
    RankingResponse,
};
