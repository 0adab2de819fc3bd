use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Compounding factor (1 + rate)^periods for a whole number of periods.
pub fn compound_factor(rate: Rate, periods: u32) -> DcfResult<Decimal> {
    if rate <= -Decimal::ONE {
        return Err(DcfError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(|| {
            DcfError::invalid(
                "rate",
                format!("(1 + {rate})^{periods} is outside the decimal range"),
            )
        })
}

/// Discount factor for a flow received at the end of `period`.
///
/// With `mid_period` the flow is assumed to arrive half a period earlier:
/// 1 / (1 + rate)^(period - 0.5).
pub fn discount_factor(rate: Rate, period: u32, mid_period: bool) -> DcfResult<Rate> {
    let mut compound = compound_factor(rate, period)?;

    if mid_period {
        let half_period = (Decimal::ONE + rate).sqrt().ok_or_else(|| {
            DcfError::invalid("rate", "Cannot take the half-period root of 1 + rate")
        })?;
        compound /= half_period;
    }

    Decimal::ONE.checked_div(compound).ok_or_else(|| {
        DcfError::invalid(
            "rate",
            format!("Discount factor for period {period} is not representable"),
        )
    })
}

/// Present value of a single amount received at `period`.
pub fn present_value(amount: Money, rate: Rate, period: u32, mid_period: bool) -> DcfResult<Money> {
    amount
        .checked_mul(discount_factor(rate, period, mid_period)?)
        .ok_or_else(|| {
            DcfError::invalid(
                "amount",
                format!("Present value of {amount} at period {period} is outside the decimal range"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_compound_factor_whole_periods() {
        assert_eq!(compound_factor(dec!(0.10), 2).unwrap(), dec!(1.21));
        assert_eq!(compound_factor(dec!(0.10), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_discount_factor_end_of_period() {
        let df = discount_factor(dec!(0.25), 1, false).unwrap();
        assert_eq!(df, dec!(0.8));
    }

    #[test]
    fn test_mid_period_discounts_less() {
        let end = discount_factor(dec!(0.10), 3, false).unwrap();
        let mid = discount_factor(dec!(0.10), 3, true).unwrap();
        assert!(mid > end);
    }

    #[test]
    fn test_present_value() {
        // 121 received in two years at 10% is worth 100 today
        let pv = present_value(dec!(121), dec!(0.10), 2, false).unwrap();
        assert!((pv - dec!(100)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_present_value_overflow_is_an_error() {
        // A negative rate grows the amount instead of shrinking it
        assert!(present_value(Decimal::MAX, dec!(-0.5), 1, false).is_err());
    }

    #[test]
    fn test_rate_at_or_below_minus_one_rejected() {
        assert!(discount_factor(dec!(-1), 1, false).is_err());
        assert!(compound_factor(dec!(-1.5), 1).is_err());
    }
}
