//! Display helpers shared by calculation traces and the feasibility report.

/// `$1,234.50`
pub fn money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u128;
    format!(
        "{sign}${}.{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Rates keep up to four decimals so `$0.0125` survives; whole values print bare.
pub fn rate(value: f64) -> String {
    if (value.fract()).abs() < 1e-9 {
        return money(value);
    }
    let trimmed = format!("{:.4}", value.abs());
    let trimmed = trimmed.trim_end_matches('0');
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let fraction = if fraction.len() < 2 {
        format!("{fraction:0<2}")
    } else {
        fraction.to_string()
    };
    let sign = if value < 0.0 { "-" } else { "" };
    let whole = whole.parse::<u128>().unwrap_or(0);
    format!("{sign}${}.{fraction}", group_thousands(whole))
}

/// `45,000` or `212.13` for fractional quantities.
pub fn quantity(value: f64) -> String {
    if (value.fract()).abs() < 1e-9 {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}{}", group_thousands(value.abs().round() as u128));
    }
    let rendered = format!("{:.2}", value.abs());
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    let whole = whole.parse::<u128>().unwrap_or(0);
    format!("{sign}{}.{fraction}", group_thousands(whole))
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_groups_and_rounds() {
        assert_eq!(money(1234.5), "$1,234.50");
        assert_eq!(money(112_500.0), "$112,500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(999.999), "$1,000.00");
    }

    #[test]
    fn rate_keeps_small_fractions() {
        assert_eq!(rate(2.5), "$2.50");
        assert_eq!(rate(0.0125), "$0.0125");
        assert_eq!(rate(150.0), "$150.00");
        assert_eq!(rate(1500.25), "$1,500.25");
    }

    #[test]
    fn quantity_formats_whole_and_fractional() {
        assert_eq!(quantity(45_000.0), "45,000");
        assert_eq!(quantity(212.132), "212.13");
        assert_eq!(quantity(1_000_000.0), "1,000,000");
    }
}
