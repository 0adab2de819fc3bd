use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::error::DcfError;
use crate::time_value::discount_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::DcfResult;

use super::scenario::{
    validate_discounting, validate_equity_bridge, validate_operating, validate_scenario,
    Scenario, ValuationAssumptions,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One explicit forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    /// 1..=projection_years
    pub year: u32,
    pub revenue: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    /// Net operating profit after tax
    pub nopat: Money,
    pub capex: Money,
    pub change_in_working_capital: Money,
    /// FCFF = NOPAT + D&A - CapEx - Delta WC
    pub free_cash_flow: Money,
}

/// Discounting applied to one year's free cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedCashFlow {
    pub year: u32,
    pub discount_factor: Rate,
    pub present_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentValues {
    pub present_value_of_cash_flows: Money,
    pub discounted_terminal_value: Money,
    pub terminal_discount_factor: Rate,
    pub schedule: Vec<DiscountedCashFlow>,
}

/// Outcome of valuing a single scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub scenario_name: String,
    pub projection: Vec<ProjectionRow>,
    pub discount_schedule: Vec<DiscountedCashFlow>,
    /// Gordon growth terminal value, undiscounted
    pub terminal_value: Money,
    pub present_value_of_cash_flows: Money,
    pub discounted_terminal_value: Money,
    /// PV(FCFs) + PV(TV)
    pub enterprise_value: Money,
    /// EV - net debt, when net debt is supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_price_per_share: Option<Money>,
    /// PV(TV) / EV; absent when EV is exactly zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_value_share: Option<Rate>,
    /// TV / final-year EBITDA
    pub implied_exit_multiple: Multiple,
    pub discount_rate_used: Rate,
    pub terminal_growth_rate_used: Rate,
}

/// A full multi-scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAnalysisInput {
    pub scenarios: Vec<Scenario>,
    pub assumptions: ValuationAssumptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioExtreme {
    pub scenario_name: String,
    pub enterprise_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    /// One result per scenario, in input order
    pub results: Vec<ValuationResult>,
    pub highest_enterprise_value: ScenarioExtreme,
    pub lowest_enterprise_value: ScenarioExtreme,
    pub enterprise_value_range: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project revenue through free cash flow for each forecast year.
///
/// Revenue compounds from `base_revenue` at the scenario's constant growth
/// rate. Assumptions are validated once here, not per row.
pub fn project_cash_flows(
    scenario: &Scenario,
    assumptions: &ValuationAssumptions,
) -> DcfResult<Vec<ProjectionRow>> {
    validate_scenario(scenario)?;
    let resolved = assumptions.resolve_for(scenario.overrides.as_ref())?;
    validate_operating(&resolved)?;

    build_projection(scenario, &resolved)
}

/// Gordon growth terminal value: FCF_n * (1 + g) / (r - g).
pub fn compute_terminal_value(
    last_row: &ProjectionRow,
    assumptions: &ValuationAssumptions,
) -> DcfResult<Money> {
    let resolved = assumptions.resolve_for(None)?;
    validate_discounting(&resolved)?;

    let r = resolved.discount_rate;
    let g = resolved.terminal_growth_rate;

    Decimal::ONE
        .checked_add(g)
        .and_then(|growth| last_row.free_cash_flow.checked_mul(growth))
        .zip(r.checked_sub(g))
        .and_then(|(next_fcf, spread)| next_fcf.checked_div(spread))
        .ok_or_else(|| {
            out_of_range(
                "terminal_growth_rate",
                format!("Terminal value with r = {r} and g = {g}"),
            )
        })
}

/// Discount each year's FCF and the terminal value back to year 0.
///
/// End-of-year discounting unless `mid_year_convention` is set; the terminal
/// value is always discounted from the end of the final projection year.
pub fn discount_to_present(
    projection: &[ProjectionRow],
    terminal_value: Money,
    assumptions: &ValuationAssumptions,
) -> DcfResult<PresentValues> {
    let resolved = assumptions.resolve_for(None)?;
    validate_discounting(&resolved)?;

    if projection.is_empty() {
        return Err(DcfError::invalid(
            "projection",
            "Cannot discount an empty projection",
        ));
    }
    if projection.len() != resolved.projection_years as usize {
        return Err(DcfError::invalid(
            "projection",
            format!(
                "Projection has {} rows but projection_years is {}",
                projection.len(),
                resolved.projection_years
            ),
        ));
    }

    let rate = resolved.discount_rate;
    let mut schedule = Vec::with_capacity(projection.len());
    for row in projection {
        let df = discount_factor(rate, row.year, resolved.mid_year_convention)?;
        schedule.push(DiscountedCashFlow {
            year: row.year,
            discount_factor: df,
            present_value: row.free_cash_flow.checked_mul(df).ok_or_else(|| {
                out_of_range("projection", format!("Present value of year {}", row.year))
            })?,
        });
    }

    let present_value_of_cash_flows = schedule
        .iter()
        .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d.present_value))
        .ok_or_else(|| out_of_range("projection", "Sum of discounted cash flows"))?;
    let terminal_discount_factor = discount_factor(rate, resolved.projection_years, false)?;
    let discounted_terminal_value = terminal_value
        .checked_mul(terminal_discount_factor)
        .ok_or_else(|| out_of_range("terminal_value", "Discounted terminal value"))?;

    Ok(PresentValues {
        present_value_of_cash_flows,
        discounted_terminal_value,
        terminal_discount_factor,
        schedule,
    })
}

/// Value one scenario: projection, terminal value, discounting and the
/// optional equity bridge.
pub fn evaluate(
    scenario: &Scenario,
    assumptions: &ValuationAssumptions,
) -> DcfResult<ValuationResult> {
    // --- Validate everything up front; no partial results ---
    validate_scenario(scenario)?;
    let resolved = assumptions.resolve_for(scenario.overrides.as_ref())?;
    validate_operating(&resolved)?;
    validate_discounting(&resolved)?;
    validate_equity_bridge(&resolved)?;

    // --- Project ---
    let projection = build_projection(scenario, &resolved)?;
    let last = projection
        .last()
        .ok_or_else(|| DcfError::invalid("projection_years", "No projection years generated"))?;

    // --- Terminal value and discounting ---
    let terminal_value = compute_terminal_value(last, &resolved)?;
    let pv = discount_to_present(&projection, terminal_value, &resolved)?;
    let enterprise_value = pv
        .present_value_of_cash_flows
        .checked_add(pv.discounted_terminal_value)
        .ok_or_else(|| {
            out_of_range(
                "enterprise_value",
                "PV of cash flows plus PV of terminal value",
            )
        })?;

    let terminal_value_share = if enterprise_value.is_zero() {
        None
    } else {
        Some(
            pv.discounted_terminal_value
                .checked_div(enterprise_value)
                .ok_or_else(|| out_of_range("enterprise_value", "Terminal value share"))?,
        )
    };
    let implied_exit_multiple = terminal_value.checked_div(last.ebitda).ok_or_else(|| {
        DcfError::invalid(
            format!("scenario:{} ebitda_margin", scenario.name),
            "Final-year EBITDA is too small to express an exit multiple",
        )
    })?;

    // --- Equity bridge ---
    let (equity_value, implied_price_per_share) =
        compute_equity_bridge(&resolved, enterprise_value)?;

    tracing::debug!(
        scenario = %scenario.name,
        enterprise_value = %enterprise_value,
        discount_rate = %resolved.discount_rate,
        "scenario evaluated"
    );

    Ok(ValuationResult {
        scenario_name: scenario.name.clone(),
        projection,
        discount_schedule: pv.schedule,
        terminal_value,
        present_value_of_cash_flows: pv.present_value_of_cash_flows,
        discounted_terminal_value: pv.discounted_terminal_value,
        enterprise_value,
        equity_value,
        implied_price_per_share,
        terminal_value_share,
        implied_exit_multiple,
        discount_rate_used: resolved.discount_rate,
        terminal_growth_rate_used: resolved.terminal_growth_rate,
    })
}

/// Value every scenario against the same shared assumptions.
///
/// Results come back in input order. Each scenario is valued independently,
/// so the numbers for a scenario do not depend on its position in the list.
/// The first failing scenario aborts the run.
pub fn evaluate_all(
    scenarios: &[Scenario],
    assumptions: &ValuationAssumptions,
) -> DcfResult<Vec<ValuationResult>> {
    validate_scenario_set(scenarios)?;
    scenarios.iter().map(|s| evaluate(s, assumptions)).collect()
}

/// Same as [`evaluate_all`], one rayon task per scenario.
///
/// When several scenarios fail, which error is returned is unspecified.
#[cfg(feature = "parallel")]
pub fn evaluate_all_parallel(
    scenarios: &[Scenario],
    assumptions: &ValuationAssumptions,
) -> DcfResult<Vec<ValuationResult>> {
    use rayon::prelude::*;

    validate_scenario_set(scenarios)?;
    scenarios
        .par_iter()
        .map(|s| evaluate(s, assumptions))
        .collect()
}

/// Run every scenario and wrap the comparison in the standard envelope.
pub fn run_scenario_analysis(
    input: &ScenarioAnalysisInput,
) -> DcfResult<ComputationOutput<ScenarioComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let results = evaluate_all(&input.scenarios, &input.assumptions)?;

    for r in &results {
        collect_warnings(r, &mut warnings);
    }

    let highest = results
        .iter()
        .max_by_key(|r| r.enterprise_value)
        .map(extreme)
        .ok_or_else(|| DcfError::invalid("scenarios", "At least one scenario is required"))?;
    let lowest = results
        .iter()
        .min_by_key(|r| r.enterprise_value)
        .map(extreme)
        .ok_or_else(|| DcfError::invalid("scenarios", "At least one scenario is required"))?;

    let enterprise_value_range = highest
        .enterprise_value
        .checked_sub(lowest.enterprise_value)
        .ok_or_else(|| out_of_range("scenarios", "Enterprise value range"))?;

    let output = ScenarioComparison {
        enterprise_value_range,
        highest_enterprise_value: highest,
        lowest_enterprise_value: lowest,
        results,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Multi-scenario FCFF DCF (Gordon growth terminal value)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn build_projection(
    scenario: &Scenario,
    assumptions: &ValuationAssumptions,
) -> DcfResult<Vec<ProjectionRow>> {
    let growth = Decimal::ONE
        .checked_add(scenario.revenue_growth_rate)
        .ok_or_else(|| {
            out_of_range(
                format!("scenario:{} revenue_growth_rate", scenario.name),
                "Growth factor",
            )
        })?;
    let mut revenue = assumptions.base_revenue;
    let mut rows = Vec::with_capacity(assumptions.projection_years as usize);

    for year in 1..=assumptions.projection_years {
        revenue = revenue.checked_mul(growth).ok_or_else(|| {
            DcfError::invalid(
                format!("scenario:{} revenue_growth_rate", scenario.name),
                format!("Projected revenue in year {year} is outside the decimal range"),
            )
        })?;

        // Margin and ratios are in [0, 1]; these stay within |revenue|
        let ebitda = revenue * scenario.ebitda_margin;
        let depreciation = revenue * assumptions.depreciation_ratio;
        let ebit = ebitda - depreciation;
        let nopat = ebit * (Decimal::ONE - assumptions.tax_rate);
        let capex = revenue * assumptions.capex_ratio;
        let change_in_working_capital = revenue * assumptions.change_in_working_capital_ratio;

        rows.push(ProjectionRow {
            year,
            revenue,
            ebitda,
            depreciation,
            ebit,
            nopat,
            capex,
            change_in_working_capital,
            free_cash_flow: free_cash_flow(nopat, depreciation, capex, change_in_working_capital)
                .ok_or_else(|| {
                    out_of_range(
                        format!("scenario:{} base_revenue", scenario.name),
                        format!("Free cash flow in year {year}"),
                    )
                })?,
        });
    }

    Ok(rows)
}

/// NOPAT + D&A - CapEx - Delta WC, or `None` outside the decimal range.
fn free_cash_flow(
    nopat: Money,
    depreciation: Money,
    capex: Money,
    change_in_working_capital: Money,
) -> Option<Money> {
    nopat
        .checked_add(depreciation)?
        .checked_sub(capex)?
        .checked_sub(change_in_working_capital)
}

fn out_of_range(field: impl Into<String>, what: impl std::fmt::Display) -> DcfError {
    DcfError::invalid(field, format!("{what} is outside the decimal range"))
}

fn validate_scenario_set(scenarios: &[Scenario]) -> DcfResult<()> {
    if scenarios.is_empty() {
        return Err(DcfError::invalid(
            "scenarios",
            "At least one scenario is required",
        ));
    }

    let mut seen = HashSet::with_capacity(scenarios.len());
    for s in scenarios {
        if !seen.insert(s.name.as_str()) {
            return Err(DcfError::invalid(
                "scenarios",
                format!("Duplicate scenario name '{}'", s.name),
            ));
        }
    }
    Ok(())
}

fn compute_equity_bridge(
    assumptions: &ValuationAssumptions,
    enterprise_value: Money,
) -> DcfResult<(Option<Money>, Option<Money>)> {
    let Some(net_debt) = assumptions.net_debt else {
        return Ok((None, None));
    };
    let equity_value = enterprise_value
        .checked_sub(net_debt)
        .ok_or_else(|| out_of_range("net_debt", "Enterprise value less net debt"))?;

    let per_share = match assumptions.shares_outstanding {
        Some(shares) => Some(
            equity_value
                .checked_div(shares)
                .ok_or(DcfError::InvalidShareCount(shares))?,
        ),
        None => None,
    };

    Ok((Some(equity_value), per_share))
}

fn collect_warnings(result: &ValuationResult, warnings: &mut Vec<String>) {
    let name = &result.scenario_name;

    if let Some(share) = result.terminal_value_share {
        if share > dec!(0.75) {
            let pct = share
                .checked_mul(dec!(100))
                .map_or_else(|| format!("{share}x"), |p| format!("{:.1}%", p));
            warnings.push(format!(
                "{name}: terminal value is {pct} of enterprise value; consider a longer explicit forecast"
            ));
        }
    }

    let negative_years: Vec<String> = result
        .projection
        .iter()
        .filter(|row| row.free_cash_flow < Decimal::ZERO)
        .map(|row| row.year.to_string())
        .collect();
    if !negative_years.is_empty() {
        warnings.push(format!(
            "{name}: negative free cash flow in year(s) {}",
            negative_years.join(", ")
        ));
    }

    if result.enterprise_value < Decimal::ZERO {
        warnings.push(format!(
            "{name}: enterprise value is negative ({})",
            result.enterprise_value
        ));
    }
}

fn extreme(result: &ValuationResult) -> ScenarioExtreme {
    ScenarioExtreme {
        scenario_name: result.scenario_name.clone(),
        enterprise_value: result.enterprise_value,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
