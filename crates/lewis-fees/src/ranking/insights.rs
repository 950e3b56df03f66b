use super::views::MarketSize;
use crate::fees::CategoryShare;

const CONCENTRATION_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Insights {
    pub(crate) strengths: Vec<String>,
    pub(crate) considerations: Vec<String>,
}

pub(crate) fn generate_insights(
    fee_pct: Option<f64>,
    population: Option<u64>,
    market_size: MarketSize,
    categories: &[CategoryShare],
) -> Insights {
    let mut insights = Insights::default();

    match fee_pct {
        Some(pct) if pct < 1.0 => insights
            .strengths
            .push("Exceptionally low fees relative to project value".to_string()),
        Some(pct) if pct < 2.0 => insights
            .strengths
            .push("Very competitive fee structure".to_string()),
        Some(pct) if pct > 5.0 => insights
            .considerations
            .push("Higher than average fees relative to project value".to_string()),
        _ => {}
    }

    match market_size {
        MarketSize::Major => insights
            .strengths
            .push("Major metropolitan market with high demand potential".to_string()),
        MarketSize::Large => insights
            .strengths
            .push("Large market with strong development opportunities".to_string()),
        MarketSize::Small => insights
            .considerations
            .push("Smaller market may have limited demand".to_string()),
        MarketSize::Medium => {}
    }

    match population {
        Some(p) if p >= 1_000_000 => insights
            .strengths
            .push("Large population base for rental demand".to_string()),
        Some(p) if p < 50_000 => insights
            .considerations
            .push("Smaller population may limit rental market".to_string()),
        _ => {}
    }

    if categories.len() <= 5 {
        insights
            .strengths
            .push("Streamlined fee structure with minimal complexity".to_string());
    } else if categories.len() > 15 {
        insights
            .considerations
            .push("Complex fee structure may require additional planning".to_string());
    }

    let concentrated: Vec<&str> = categories
        .iter()
        .filter(|share| share.percentage > CONCENTRATION_THRESHOLD)
        .map(|share| share.category.as_str())
        .collect();
    if !concentrated.is_empty() {
        insights.considerations.push(format!(
            "High concentration of fees in: {}",
            concentrated.join(", ")
        ));
    }

    insights
}
