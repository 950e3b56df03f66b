//! Water meter sizing. Schedules price larger connections non-linearly, so the
//! multiplier table must stay monotonic in physical size.

/// Multiplier applied when a size is missing or unrecognized.
pub const BASE_MULTIPLIER: f64 = 1.0;

const SIZE_TOLERANCE: f64 = 0.01;

/// (nominal inches, canonical token, multiplier), ascending by size.
static METER_TABLE: [(f64, &str, f64); 11] = [
    (0.625, "5/8\" x 3/4\"", 1.0),
    (0.75, "3/4\"", 1.2),
    (1.0, "1\"", 1.5),
    (1.5, "1.5\"", 2.0),
    (2.0, "2\"", 3.0),
    (3.0, "3\"", 5.0),
    (4.0, "4\"", 8.0),
    (6.0, "6\"", 15.0),
    (8.0, "8\"", 25.0),
    (10.0, "10\"", 40.0),
    (12.0, "12\"", 60.0),
];

pub fn meter_multiplier(size: &str) -> f64 {
    meter_size_inches(size)
        .and_then(|inches| {
            METER_TABLE
                .iter()
                .find(|(nominal, _, _)| (nominal - inches).abs() < SIZE_TOLERANCE)
                .map(|(_, _, multiplier)| *multiplier)
        })
        .unwrap_or(BASE_MULTIPLIER)
}

/// Canonical token for a size, e.g. `1-1/2"` becomes `1.5"`.
pub fn canonical_meter_size(size: &str) -> Option<&'static str> {
    let inches = meter_size_inches(size)?;
    METER_TABLE
        .iter()
        .find(|(nominal, _, _)| (nominal - inches).abs() < SIZE_TOLERANCE)
        .map(|(_, token, _)| *token)
}

/// Converts a free-form size token to inches.
///
/// Accepts `2"`, `2 inch`, `1.5`, `3/4"`, `1-1/2"`, `1 1/2"` and the compound
/// `5/8" x 3/4"` (which sizes by its first dimension).
pub fn meter_size_inches(size: &str) -> Option<f64> {
    let lowered = size.trim().to_ascii_lowercase();
    let first = lowered.split('x').next().unwrap_or_default();
    let cleaned = first
        .replace(['"', '\u{201c}', '\u{201d}', '\u{2033}'], "")
        .replace("inches", "")
        .replace("inch", "")
        .replace("in.", "")
        .replace("meter", "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return None;
    }

    let mut parts = cleaned
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let head = parts.next()?;
    let tail = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let inches = match tail {
        Some(fraction) => parse_fraction(head)? + parse_fraction(fraction)?,
        None => parse_fraction(head)?,
    };

    Some(inches).filter(|value| value.is_finite() && *value > 0.0)
}

fn parse_fraction(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator = numerator.trim().parse::<f64>().ok()?;
            let denominator = denominator.trim().parse::<f64>().ok()?;
            if denominator == 0.0 {
                None
            } else {
                Some(numerator / denominator)
            }
        }
        None => value.trim().parse::<f64>().ok(),
    }
}

/// True when two size tokens describe the same nominal size.
pub fn meter_sizes_match(left: &str, right: &str) -> bool {
    match (meter_size_inches(left), meter_size_inches(right)) {
        (Some(a), Some(b)) => (a - b).abs() < SIZE_TOLERANCE,
        _ => false,
    }
}

/// Meter constraint carried by a fee's unit label, e.g. `2" meter` or `up to 1"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterConstraint {
    Exactly(f64),
    UpTo(f64),
}

impl MeterConstraint {
    pub fn from_label(label: &str) -> Option<Self> {
        let lowered = label.to_ascii_lowercase();
        let quote = lowered.find(['"', '\u{201d}', '\u{2033}'])?;
        let prefix = &lowered[..quote];
        let start = prefix
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | '/' | '-'))
            .last()
            .map(|(index, _)| index)?;
        let inches = meter_size_inches(&prefix[start..])?;

        if prefix[..start].trim_end().ends_with("up to") {
            Some(Self::UpTo(inches))
        } else {
            Some(Self::Exactly(inches))
        }
    }

    pub fn admits(&self, size: &str) -> bool {
        let Some(inches) = meter_size_inches(size) else {
            return false;
        };
        match self {
            Self::Exactly(expected) => (expected - inches).abs() < SIZE_TOLERANCE,
            Self::UpTo(limit) => inches <= limit + SIZE_TOLERANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tokens_map_to_table() {
        assert_eq!(meter_multiplier("5/8\" x 3/4\""), 1.0);
        assert_eq!(meter_multiplier("3/4\""), 1.2);
        assert_eq!(meter_multiplier("2\""), 3.0);
        assert_eq!(meter_multiplier("12\""), 60.0);
    }

    #[test]
    fn multipliers_are_monotonic_by_size() {
        assert!(meter_multiplier("2\"") > meter_multiplier("3/4\""));
        assert!(meter_multiplier("3/4\"") > meter_multiplier("5/8\" x 3/4\""));
        for pair in METER_TABLE.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].2 < pair[1].2);
        }
    }

    #[test]
    fn unknown_sizes_use_base_multiplier() {
        assert_eq!(meter_multiplier("huge"), BASE_MULTIPLIER);
        assert_eq!(meter_multiplier("5\""), BASE_MULTIPLIER);
        assert_eq!(meter_multiplier(""), BASE_MULTIPLIER);
    }

    #[test]
    fn fractional_spellings_normalize() {
        assert_eq!(meter_size_inches("1-1/2\""), Some(1.5));
        assert_eq!(meter_size_inches("1 1/2 inch"), Some(1.5));
        assert_eq!(canonical_meter_size("1-1/2\""), Some("1.5\""));
        assert_eq!(meter_multiplier("1.5"), 2.0);
        assert!(meter_sizes_match("3/4\"", "0.75"));
    }

    #[test]
    fn label_constraints_are_detected() {
        assert_eq!(
            MeterConstraint::from_label("2\" meter"),
            Some(MeterConstraint::Exactly(2.0))
        );
        assert_eq!(
            MeterConstraint::from_label("per unit, up to 1\" meter"),
            Some(MeterConstraint::UpTo(1.0))
        );
        assert_eq!(MeterConstraint::from_label("per dwelling unit"), None);

        let bounded = MeterConstraint::UpTo(1.0);
        assert!(bounded.admits("3/4\""));
        assert!(!bounded.admits("2\""));
    }
}
