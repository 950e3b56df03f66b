use super::domain::RawRate;

/// Normalizes a catalog rate into a number. `None` means the fee contributes nothing.
pub fn parse_rate(raw: &RawRate) -> Option<f64> {
    match raw {
        RawRate::Number(value) => Some(*value).filter(|v| v.is_finite()),
        RawRate::Text(text) => parse_rate_str(text),
    }
}

pub fn parse_rate_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | ',' | '%'))
        .collect();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("n/a") || cleaned.eq_ignore_ascii_case("na")
    {
        return None;
    }

    // Rust accepts "inf"/"NaN" as floats; catalogs never mean those.
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}
