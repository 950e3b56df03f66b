use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::insights::generate_insights;
use super::scoring::{
    development_friendly_score, economic_viability_score, fee_percentage, overall_score,
};
use super::views::{
    ExcludedJurisdiction, ExclusionReason, JurisdictionRanking, MarketSize, RankingOutcome,
};
use crate::catalog::{CatalogError, FeeCatalog, Jurisdiction};
use crate::config::EngineConfig;
use crate::fees::{
    build_breakdown, CalculatedFee, CategoryShare, FeeBreakdown, FeeRule, ProjectDetails,
    ProjectInputs, ProjectionPolicy,
};

/// Fee rows fetched for one jurisdiction, or why they could not be.
#[derive(Debug, Clone)]
pub struct FetchedJurisdiction {
    pub jurisdiction: Jurisdiction,
    pub rules: Result<Vec<FeeRule>, String>,
}

/// Cross-jurisdiction ranking over a catalog.
pub struct RankingService<C> {
    catalog: Arc<C>,
    policy: ProjectionPolicy,
    concurrency: usize,
    fetch_timeout: Duration,
}

impl<C> RankingService<C>
where
    C: FeeCatalog + 'static,
{
    pub fn new(catalog: Arc<C>, config: &EngineConfig) -> Self {
        Self {
            catalog,
            policy: config.projection.clone(),
            concurrency: config.ranking_concurrency.max(1),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Ranks every active jurisdiction. Only a failure to list jurisdictions fails
    /// the call; per-jurisdiction failures are reported in `excluded`.
    pub async fn rank_jurisdictions(
        &self,
        details: &ProjectDetails,
    ) -> Result<RankingOutcome, RankingError> {
        let jurisdictions = self.load_jurisdictions().await?;
        let fetched = self.fetch_all(jurisdictions).await;
        let outcome = rank_fetched(fetched, details, &self.policy);

        info!(
            ranked = outcome.rankings.len(),
            excluded = outcome.excluded.len(),
            project_type = %details.project_type,
            "ranked jurisdictions"
        );
        Ok(outcome)
    }

    pub async fn top_jurisdictions(
        &self,
        details: &ProjectDetails,
        limit: usize,
    ) -> Result<RankingOutcome, RankingError> {
        let mut outcome = self.rank_jurisdictions(details).await?;
        outcome.rankings.truncate(limit);
        Ok(outcome)
    }

    async fn load_jurisdictions(&self) -> Result<Vec<Jurisdiction>, RankingError> {
        let catalog = Arc::clone(&self.catalog);
        let task = tokio::task::spawn_blocking(move || catalog.jurisdictions());
        let listed = tokio::time::timeout(self.fetch_timeout, task)
            .await
            .map_err(|_| RankingError::Timeout(self.fetch_timeout))?
            .map_err(|error| RankingError::Task(error.to_string()))??;

        let mut active: Vec<Jurisdiction> = listed
            .into_iter()
            .filter(|jurisdiction| jurisdiction.is_active)
            .collect();
        active.sort_by(|a, b| b.population.cmp(&a.population));
        Ok(active)
    }

    /// Fetches fee rows with bounded concurrency, preserving input order.
    async fn fetch_all(&self, jurisdictions: Vec<Jurisdiction>) -> Vec<FetchedJurisdiction> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let timeout = self.fetch_timeout;
        let mut handles = Vec::with_capacity(jurisdictions.len());

        for jurisdiction in jurisdictions {
            let semaphore = Arc::clone(&semaphore);
            let catalog = Arc::clone(&self.catalog);
            let placeholder = jurisdiction.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return FetchedJurisdiction {
                        jurisdiction,
                        rules: Err("ranking cancelled".to_string()),
                    };
                };

                let id = jurisdiction.id.clone();
                let fetch = tokio::task::spawn_blocking(move || catalog.fee_rules(&id));
                let rules = match tokio::time::timeout(timeout, fetch).await {
                    Ok(Ok(Ok(rules))) => Ok(rules),
                    Ok(Ok(Err(error))) => Err(error.to_string()),
                    Ok(Err(error)) => Err(format!("fetch task failed: {error}")),
                    Err(_) => Err(format!("fetch timed out after {} ms", timeout.as_millis())),
                };
                FetchedJurisdiction {
                    jurisdiction,
                    rules,
                }
            });
            handles.push((placeholder, handle));
        }

        let mut fetched = Vec::with_capacity(handles.len());
        for (jurisdiction, handle) in handles {
            match handle.await {
                Ok(result) => fetched.push(result),
                Err(error) => fetched.push(FetchedJurisdiction {
                    jurisdiction,
                    rules: Err(format!("fetch task failed: {error}")),
                }),
            }
        }
        fetched
    }
}

/// Scores fetched jurisdictions. Input order breaks score ties.
pub fn rank_fetched(
    fetched: Vec<FetchedJurisdiction>,
    details: &ProjectDetails,
    policy: &ProjectionPolicy,
) -> RankingOutcome {
    let mut outcome = RankingOutcome::default();

    for FetchedJurisdiction {
        jurisdiction,
        rules,
    } in fetched
    {
        let rules = match rules {
            Ok(rules) => rules,
            Err(reason) => {
                warn!(jurisdiction = %jurisdiction.id, %reason, "excluding jurisdiction from ranking");
                outcome.excluded.push(ExcludedJurisdiction {
                    jurisdiction_id: jurisdiction.id,
                    jurisdiction_name: jurisdiction.name,
                    reason: ExclusionReason::DataUnavailable { reason },
                });
                continue;
            }
        };

        let project = ProjectInputs {
            jurisdiction_name: jurisdiction.name.clone(),
            state_code: jurisdiction.state_code.clone(),
            selected_service_area_ids: Vec::new(),
            details: details.clone(),
        };
        let breakdown = build_breakdown(&jurisdiction, &rules, project, policy);

        if breakdown.fees.is_empty() {
            debug!(jurisdiction = %jurisdiction.id, "no applicable fees");
            outcome.excluded.push(ExcludedJurisdiction {
                jurisdiction_id: jurisdiction.id,
                jurisdiction_name: jurisdiction.name,
                reason: ExclusionReason::NoApplicableFees,
            });
            continue;
        }

        outcome
            .rankings
            .push(score_jurisdiction(&jurisdiction, &breakdown, details));
    }

    outcome
        .rankings
        .sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
    for (index, ranking) in outcome.rankings.iter_mut().enumerate() {
        ranking.rank = index + 1;
    }
    outcome
}

pub fn score_jurisdiction(
    jurisdiction: &Jurisdiction,
    breakdown: &FeeBreakdown,
    details: &ProjectDetails,
) -> JurisdictionRanking {
    let totals = &breakdown.totals;
    let total_fees = totals.first_year_total;
    let categories = annualized_category_shares(&breakdown.fees, total_fees);

    let fee_pct = fee_percentage(total_fees, details.project_value());
    let market_size = MarketSize::from_population(jurisdiction.population);
    let development_friendly = development_friendly_score(fee_pct, &categories);
    let economic_viability = economic_viability_score(jurisdiction.population, market_size, fee_pct);
    let insights = generate_insights(fee_pct, jurisdiction.population, market_size, &categories);

    JurisdictionRanking {
        jurisdiction_id: jurisdiction.id.clone(),
        jurisdiction_name: jurisdiction.name.clone(),
        state_code: jurisdiction.state_code.clone(),
        kind: jurisdiction.kind.clone(),
        population: jurisdiction.population,
        total_fees,
        one_time_fees: totals.one_time_fees,
        annual_operating_costs: totals.annual_operating_costs,
        fee_per_unit: details.units().map(|units| total_fees / units),
        fee_per_sqft: details.square_feet().map(|sqft| total_fees / sqft),
        fee_per_dollar: details.project_value().map(|value| total_fees / value),
        market_size,
        development_friendly,
        economic_viability,
        overall_score: overall_score(development_friendly, economic_viability),
        rank: 0,
        strengths: insights.strengths,
        considerations: insights.considerations,
        fee_breakdown: categories,
        needs_rules_count: breakdown.needs_rules.len(),
    }
}

/// Category totals on the same first-year basis as `total_fees`: monthly charges
/// count twelve times. Zero categories are dropped.
pub fn annualized_category_shares(fees: &[CalculatedFee], total_fees: f64) -> Vec<CategoryShare> {
    let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for fee in fees {
        *by_category.entry(fee.category.as_str()).or_insert(0.0) += fee.annualized_amount();
    }

    let mut shares: Vec<CategoryShare> = by_category
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(category, amount)| CategoryShare {
            category: category.to_string(),
            amount,
            percentage: if total_fees > 0.0 {
                amount / total_fees * 100.0
            } else {
                0.0
            },
        })
        .collect();
    shares.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    shares
}

#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("failed to fetch jurisdictions: {0}")]
    Catalog(#[from] CatalogError),
    #[error("jurisdiction listing timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("ranking task failed: {0}")]
    Task(String),
}
