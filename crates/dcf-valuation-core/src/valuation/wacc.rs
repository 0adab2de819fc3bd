use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::DcfResult;

/// CAPM build-up inputs for deriving a discount rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccInput {
    pub risk_free_rate: Rate,
    pub equity_risk_premium: Rate,
    /// Levered equity beta
    pub beta: Decimal,
    /// Pre-tax cost of debt
    pub cost_of_debt: Rate,
    pub tax_rate: Rate,
    /// D / (D + E), market value basis
    pub debt_weight: Rate,
    /// E / (D + E), market value basis
    pub equity_weight: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_premium: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_risk_premium: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_risk_premium: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
}

/// Calculate WACC via CAPM build-up, wrapped in the standard envelope.
pub fn calculate_wacc(input: &WaccInput) -> DcfResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = build_up(input)?;

    if input.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): betas above 3.0 are unusual",
            input.beta
        ));
    }
    if output.wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {} exceeds 20%; typical only for distressed or frontier-market issuers",
            output.wacc
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "WACC via CAPM build-up",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// The discount rate implied by a CAPM build-up, without the envelope.
pub fn derive_discount_rate(input: &WaccInput) -> DcfResult<Rate> {
    Ok(build_up(input)?.wacc)
}

fn build_up(input: &WaccInput) -> DcfResult<WaccOutput> {
    validate_wacc_input(input)?;

    // Ke = Rf + Beta * ERP + premia
    let cost_of_equity = input.risk_free_rate
        + input.beta * input.equity_risk_premium
        + input.size_premium.unwrap_or(Decimal::ZERO)
        + input.country_risk_premium.unwrap_or(Decimal::ZERO)
        + input.specific_risk_premium.unwrap_or(Decimal::ZERO);

    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);

    let wacc = cost_of_equity * input.equity_weight + after_tax_cost_of_debt * input.debt_weight;

    Ok(WaccOutput {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
    })
}

fn validate_wacc_input(input: &WaccInput) -> DcfResult<()> {
    if input.risk_free_rate < Decimal::ZERO {
        return Err(DcfError::invalid(
            "wacc_build_up.risk_free_rate",
            "Risk-free rate cannot be negative",
        ));
    }
    if input.equity_risk_premium < Decimal::ZERO {
        return Err(DcfError::invalid(
            "wacc_build_up.equity_risk_premium",
            "Equity risk premium cannot be negative",
        ));
    }
    if input.beta <= Decimal::ZERO {
        return Err(DcfError::invalid(
            "wacc_build_up.beta",
            "Beta must be positive",
        ));
    }
    if input.cost_of_debt < Decimal::ZERO {
        return Err(DcfError::invalid(
            "wacc_build_up.cost_of_debt",
            "Cost of debt cannot be negative",
        ));
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(DcfError::invalid(
            "wacc_build_up.tax_rate",
            "Tax rate must be between 0 and 1",
        ));
    }
    if input.debt_weight < Decimal::ZERO || input.equity_weight < Decimal::ZERO {
        return Err(DcfError::invalid(
            "wacc_build_up.debt_weight / equity_weight",
            "Capital structure weights cannot be negative",
        ));
    }

    let weight_sum = input.debt_weight + input.equity_weight;
    if (weight_sum - Decimal::ONE).abs() > dec!(0.001) {
        return Err(DcfError::invalid(
            "wacc_build_up.debt_weight + equity_weight",
            format!("Capital structure weights must sum to 1.0, got {weight_sum}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn industrial() -> WaccInput {
        WaccInput {
            risk_free_rate: dec!(0.042),
            equity_risk_premium: dec!(0.055),
            beta: dec!(1.10),
            cost_of_debt: dec!(0.055),
            tax_rate: dec!(0.21),
            debt_weight: dec!(0.30),
            equity_weight: dec!(0.70),
            size_premium: None,
            country_risk_premium: None,
            specific_risk_premium: None,
        }
    }

    #[test]
    fn test_us_industrial_build_up() {
        let out = calculate_wacc(&industrial()).unwrap().result;
        // Ke = 0.042 + 1.1 * 0.055 = 0.1025
        assert_eq!(out.cost_of_equity, dec!(0.1025));
        // Kd = 0.055 * 0.79 = 0.04345
        assert_eq!(out.after_tax_cost_of_debt, dec!(0.04345));
        // WACC = 0.1025 * 0.7 + 0.04345 * 0.3 = 0.07175 + 0.013035
        assert_eq!(out.wacc, dec!(0.084785));
    }

    #[test]
    fn test_premia_add_to_cost_of_equity() {
        let mut input = industrial();
        input.size_premium = Some(dec!(0.01));
        input.country_risk_premium = Some(dec!(0.02));
        let out = calculate_wacc(&input).unwrap().result;
        assert_eq!(out.cost_of_equity, dec!(0.1325));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut input = industrial();
        input.equity_weight = dec!(0.60);
        assert!(matches!(
            derive_discount_rate(&input),
            Err(DcfError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_high_wacc_warns() {
        let mut input = industrial();
        input.beta = dec!(4.5);
        let out = calculate_wacc(&input).unwrap();
        assert_eq!(out.warnings.len(), 2);
    }
}
