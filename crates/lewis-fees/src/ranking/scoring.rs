//! Score components. All scores are clamped to 0..=100 and depend only on their
//! arguments, so identical inputs always rank identically.

use super::views::MarketSize;
use crate::fees::CategoryShare;

pub const DEVELOPMENT_WEIGHT: f64 = 0.4;
pub const ECONOMIC_WEIGHT: f64 = 0.6;

const ADMIN_KEYWORDS: [&str; 3] = ["administrative", "processing", "filing"];
const ADMIN_SHARE_LIMIT: f64 = 20.0;
const STREAMLINED_CATEGORIES: usize = 5;
const COMPLEX_CATEGORIES: usize = 15;

/// Fees as a percentage of project value; `None` when value is unknown.
pub fn fee_percentage(total_fees: f64, project_value: Option<f64>) -> Option<f64> {
    project_value
        .filter(|value| *value > 0.0)
        .map(|value| total_fees / value * 100.0)
}

/// Combined share of administrative, processing, and filing categories.
pub fn administrative_share(categories: &[CategoryShare]) -> f64 {
    categories
        .iter()
        .filter(|share| {
            let category = share.category.to_lowercase();
            ADMIN_KEYWORDS.iter().any(|keyword| category.contains(keyword))
        })
        .map(|share| share.percentage)
        .sum()
}

fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

pub fn development_friendly_score(fee_pct: Option<f64>, categories: &[CategoryShare]) -> u8 {
    let mut score = 100;

    match fee_pct {
        Some(pct) if pct > 5.0 => score -= 30,
        Some(pct) if pct > 3.0 => score -= 20,
        Some(pct) if pct > 2.0 => score -= 10,
        _ => {}
    }

    if administrative_share(categories) > ADMIN_SHARE_LIMIT {
        score -= 15;
    }

    if categories.len() <= STREAMLINED_CATEGORIES {
        score += 10;
    } else if categories.len() > COMPLEX_CATEGORIES {
        score -= 10;
    }

    clamp_score(score)
}

pub fn economic_viability_score(
    population: Option<u64>,
    market_size: MarketSize,
    fee_pct: Option<f64>,
) -> u8 {
    let mut score = 50;

    match population {
        Some(p) if p >= 1_000_000 => score += 25,
        Some(p) if p >= 500_000 => score += 20,
        Some(p) if p >= 100_000 => score += 15,
        Some(p) if p >= 50_000 => score += 10,
        _ => {}
    }

    score += match market_size {
        MarketSize::Major => 20,
        MarketSize::Large => 15,
        MarketSize::Medium => 10,
        MarketSize::Small => 5,
    };

    match fee_pct {
        Some(pct) if pct < 1.0 => score += 15,
        Some(pct) if pct < 2.0 => score += 10,
        Some(pct) if pct < 3.0 => score += 5,
        Some(pct) if pct > 5.0 => score -= 10,
        _ => {}
    }

    clamp_score(score)
}

pub fn overall_score(development_friendly: u8, economic_viability: u8) -> f64 {
    DEVELOPMENT_WEIGHT * f64::from(development_friendly)
        + ECONOMIC_WEIGHT * f64::from(economic_viability)
}
