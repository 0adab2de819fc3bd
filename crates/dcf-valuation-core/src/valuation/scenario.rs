use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::types::{Currency, Money, Rate};
use crate::DcfResult;

use super::wacc::{derive_discount_rate, WaccInput};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named growth / margin case, e.g. "Bull" or "Base".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Identifier, unique within a run
    pub name: String,
    /// Constant annual revenue growth across the horizon
    pub revenue_growth_rate: Rate,
    /// EBITDA as a fraction of revenue
    pub ebitda_margin: Rate,
    /// Scenario-specific replacements for shared assumptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<AssumptionOverrides>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, revenue_growth_rate: Rate, ebitda_margin: Rate) -> Self {
        Scenario {
            name: name.into(),
            revenue_growth_rate,
            ebitda_margin,
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: AssumptionOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// Per-scenario replacements for fields of [`ValuationAssumptions`].
/// Any field left as `None` falls through to the shared value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssumptionOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capex_ratio: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depreciation_ratio: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_in_working_capital_ratio: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_growth_rate: Option<Rate>,
}

/// Assumptions shared by every scenario in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationAssumptions {
    /// Year-0 actual revenue
    pub base_revenue: Money,
    /// Number of explicit forecast years
    pub projection_years: u32,
    /// Marginal tax rate on operating income
    pub tax_rate: Rate,
    /// Capital expenditure as a fraction of revenue
    pub capex_ratio: Rate,
    /// Depreciation & amortisation as a fraction of revenue
    pub depreciation_ratio: Rate,
    /// Change in working capital as a fraction of revenue
    pub change_in_working_capital_ratio: Rate,
    /// WACC
    pub discount_rate: Rate,
    /// Perpetuity growth used in the Gordon growth terminal value
    pub terminal_growth_rate: Rate,
    /// Debt minus cash, for the equity bridge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<Money>,
    /// Diluted shares outstanding, for the per-share value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    /// Discount explicit-period flows at mid-year instead of year end
    #[serde(default)]
    pub mid_year_convention: bool,
    #[serde(default)]
    pub currency: Currency,
    /// If provided, the discount rate is built up from CAPM and replaces
    /// `discount_rate` for every scenario without its own override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc_build_up: Option<WaccInput>,
}

impl ValuationAssumptions {
    /// Apply a scenario's overrides and resolve any WACC build-up, giving the
    /// assumptions that scenario is actually valued under.
    ///
    /// The returned value never carries a `wacc_build_up`, so resolving it a
    /// second time is a no-op.
    pub fn resolve_for(&self, overrides: Option<&AssumptionOverrides>) -> DcfResult<Self> {
        let mut resolved = self.clone();

        if let Some(build_up) = resolved.wacc_build_up.take() {
            resolved.discount_rate = derive_discount_rate(&build_up)?;
        }

        if let Some(o) = overrides {
            if let Some(v) = o.tax_rate {
                resolved.tax_rate = v;
            }
            if let Some(v) = o.capex_ratio {
                resolved.capex_ratio = v;
            }
            if let Some(v) = o.depreciation_ratio {
                resolved.depreciation_ratio = v;
            }
            if let Some(v) = o.change_in_working_capital_ratio {
                resolved.change_in_working_capital_ratio = v;
            }
            if let Some(v) = o.discount_rate {
                resolved.discount_rate = v;
            }
            if let Some(v) = o.terminal_growth_rate {
                resolved.terminal_growth_rate = v;
            }
        }

        Ok(resolved)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_scenario(scenario: &Scenario) -> DcfResult<()> {
    if scenario.name.trim().is_empty() {
        return Err(DcfError::invalid("name", "Scenario name must not be empty"));
    }
    if scenario.revenue_growth_rate <= -Decimal::ONE {
        return Err(DcfError::invalid(
            format!("scenario:{} revenue_growth_rate", scenario.name),
            "Revenue growth must be greater than -100%",
        ));
    }
    if scenario.ebitda_margin <= Decimal::ZERO || scenario.ebitda_margin > Decimal::ONE {
        return Err(DcfError::invalid(
            format!("scenario:{} ebitda_margin", scenario.name),
            "EBITDA margin must be in (0, 1]",
        ));
    }
    Ok(())
}

/// Checks the operating assumptions that drive the projection.
pub(crate) fn validate_operating(assumptions: &ValuationAssumptions) -> DcfResult<()> {
    if assumptions.projection_years < 1 {
        return Err(DcfError::invalid(
            "projection_years",
            "At least one projection year is required",
        ));
    }
    if assumptions.base_revenue <= Decimal::ZERO {
        return Err(DcfError::invalid(
            "base_revenue",
            "Base revenue must be positive",
        ));
    }
    check_unit_interval("tax_rate", assumptions.tax_rate)?;
    check_unit_interval("capex_ratio", assumptions.capex_ratio)?;
    check_unit_interval("depreciation_ratio", assumptions.depreciation_ratio)?;
    check_unit_interval(
        "change_in_working_capital_ratio",
        assumptions.change_in_working_capital_ratio,
    )?;
    Ok(())
}

/// Checks the discounting assumptions. The Gordon growth constraint is
/// reported as its own error kind rather than as a bad input.
pub(crate) fn validate_discounting(assumptions: &ValuationAssumptions) -> DcfResult<()> {
    let r = assumptions.discount_rate;
    let g = assumptions.terminal_growth_rate;

    if r <= g {
        return Err(DcfError::DegenerateTerminalValue {
            discount_rate: r,
            terminal_growth_rate: g,
        });
    }
    if r <= Decimal::ZERO {
        return Err(DcfError::invalid(
            "discount_rate",
            "Discount rate must be positive",
        ));
    }
    if g <= -Decimal::ONE {
        return Err(DcfError::invalid(
            "terminal_growth_rate",
            "Terminal growth must be greater than -100%",
        ));
    }
    Ok(())
}

/// A supplied share count must be positive, even when no net debt is given.
pub(crate) fn validate_equity_bridge(assumptions: &ValuationAssumptions) -> DcfResult<()> {
    match assumptions.shares_outstanding {
        Some(shares) if shares <= Decimal::ZERO => Err(DcfError::InvalidShareCount(shares)),
        _ => Ok(()),
    }
}

fn check_unit_interval(field: &str, value: Rate) -> DcfResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(DcfError::invalid(field, "Must be between 0 and 1"));
    }
    Ok(())
}
