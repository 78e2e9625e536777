use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Currency;

/// Format an amount with its currency symbol and thousands separators: £1,234.56
pub fn money(val: Decimal, currency: Currency) -> String {
    let val = val.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = val.is_sign_negative() && !val.is_zero();
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    let symbol = currency.symbol();

    if negative {
        format!("-{symbol}{with_commas}.{dec_part}")
    } else {
        format!("{symbol}{with_commas}.{dec_part}")
    }
}

/// Money for an optional amount, blank when absent.
pub fn money_opt(val: Option<Decimal>, currency: Currency) -> String {
    val.map(|v| money(v, currency)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::new(123456, 2), Currency::Gbp), "\u{a3}1,234.56");
        assert_eq!(money(Decimal::new(-50000, 2), Currency::Eur), "-\u{20ac}500.00");
        assert_eq!(money(Decimal::ZERO, Currency::Gbp), "\u{a3}0.00");
        assert_eq!(money(Decimal::new(100000099, 2), Currency::Eur), "\u{20ac}1,000,000.99");
        assert_eq!(money(Decimal::new(421, 1), Currency::Gbp), "\u{a3}42.10");
    }

    #[test]
    fn test_money_rounds_half_away_from_zero() {
        let pension = Decimal::from(5000) * Decimal::new(10, 2) / Decimal::from(12);
        assert_eq!(money(pension, Currency::Eur), "\u{20ac}41.67");
        assert_eq!(money(Decimal::new(-12345, 3), Currency::Gbp), "-\u{a3}12.35");
        assert_eq!(money(Decimal::new(-1, 3), Currency::Gbp), "\u{a3}0.00");
    }

    #[test]
    fn test_money_opt_blank() {
        assert_eq!(money_opt(None, Currency::Gbp), "");
    }
}
