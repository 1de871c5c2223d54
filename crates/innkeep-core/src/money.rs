//! Currency arithmetic helpers
//!
//! Every monetary component is rounded to the currency's smallest unit at
//! the moment it is produced, so repeated recalculation never drifts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currencies whose smallest circulating unit is the whole unit
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["NPR", "JPY", "KRW", "IDR", "VND"];

/// Number of decimal places kept for a currency
pub fn minor_unit_scale(currency: &str) -> u32 {
    if ZERO_DECIMAL_CURRENCIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(currency))
    {
        0
    } else {
        2
    }
}

/// Round an amount to the currency's smallest unit (half away from zero)
#[inline]
pub fn round_currency(amount: Decimal, currency: &str) -> Decimal {
    amount.round_dp_with_strategy(
        minor_unit_scale(currency),
        RoundingStrategy::MidpointAwayFromZero,
    )
}

/// `amount × percent / 100`, rounded to the currency unit
#[inline]
pub fn percent_of(amount: Decimal, percent: Decimal, currency: &str) -> Decimal {
    round_currency(amount * percent / Decimal::ONE_HUNDRED, currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_unit_scale() {
        assert_eq!(minor_unit_scale("NPR"), 0);
        assert_eq!(minor_unit_scale("npr"), 0);
        assert_eq!(minor_unit_scale("USD"), 2);
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(dec!(1234.5), "NPR"), dec!(1235));
        assert_eq!(round_currency(dec!(1234.49), "NPR"), dec!(1234));
        assert_eq!(round_currency(dec!(-10.5), "NPR"), dec!(-11));
        assert_eq!(round_currency(dec!(10.005), "USD"), dec!(10.01));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(54000), dec!(13), "NPR"), dec!(7020));
        assert_eq!(percent_of(dec!(54000), dec!(10), "NPR"), dec!(5400));
        assert_eq!(percent_of(dec!(99.99), dec!(13), "USD"), dec!(13.00));
    }
}
