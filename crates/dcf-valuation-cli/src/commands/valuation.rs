use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use dcf_valuation_core::types::Currency;
use dcf_valuation_core::valuation::dcf::{self, ScenarioAnalysisInput};
use dcf_valuation_core::valuation::presets;
use dcf_valuation_core::valuation::scenario::{Scenario, ValuationAssumptions};
use dcf_valuation_core::valuation::wacc::{self, WaccInput};

use crate::input;

/// Built-in input sets
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Preset {
    /// Base / Bull / Bear semiconductor-equipment case with LRCX, AMAT, KLAC, TER peers
    Reference,
}

/// Arguments for WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Risk-free rate (e.g. 0.042 for 4.2%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Equity risk premium (e.g. 0.055 for 5.5%)
    #[arg(long, alias = "erp")]
    pub equity_risk_premium: Option<Decimal>,

    /// Levered beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,

    /// Marginal corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Debt weight in capital structure (market value basis)
    #[arg(long)]
    pub debt_weight: Option<Decimal>,

    /// Equity weight in capital structure (market value basis)
    #[arg(long)]
    pub equity_weight: Option<Decimal>,

    /// Size premium
    #[arg(long)]
    pub size_premium: Option<Decimal>,

    /// Country risk premium
    #[arg(long)]
    pub country_risk: Option<Decimal>,

    /// Company-specific risk premium
    #[arg(long)]
    pub specific_risk: Option<Decimal>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a multi-scenario DCF valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON or YAML file with `scenarios` and `assumptions`
    #[arg(long)]
    pub input: Option<String>,

    /// Use a built-in input set instead of flags
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Scenario as NAME:GROWTH:MARGIN, e.g. Bull:0.20:0.40 (repeatable)
    #[arg(long = "scenario", value_parser = parse_scenario)]
    pub scenarios: Vec<Scenario>,

    /// Revenue growth rate for a single unnamed scenario
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// EBITDA margin for a single unnamed scenario
    #[arg(long)]
    pub ebitda_margin: Option<Decimal>,

    /// Year-0 revenue
    #[arg(long)]
    pub base_revenue: Option<Decimal>,

    /// Projection years
    #[arg(long, default_value = "5")]
    pub years: u32,

    /// Tax rate on operating income
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Capital expenditure as a fraction of revenue
    #[arg(long, default_value = "0")]
    pub capex_ratio: Decimal,

    /// Depreciation as a fraction of revenue
    #[arg(long, default_value = "0")]
    pub depreciation_ratio: Decimal,

    /// Change in working capital as a fraction of revenue
    #[arg(long, default_value = "0")]
    pub working_capital_ratio: Decimal,

    /// Discount rate (WACC)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Terminal growth rate
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Net debt for the equity bridge
    #[arg(long)]
    pub net_debt: Option<Decimal>,

    /// Diluted shares outstanding for the per-share value
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Discount explicit-period cash flows at mid-year
    #[arg(long)]
    pub mid_year: bool,
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input: WaccInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        WaccInput {
            risk_free_rate: args
                .risk_free_rate
                .ok_or("--risk-free-rate is required (or provide --input)")?,
            equity_risk_premium: args
                .equity_risk_premium
                .ok_or("--equity-risk-premium is required (or provide --input)")?,
            beta: args.beta.unwrap_or(dec!(1.0)),
            cost_of_debt: args
                .cost_of_debt
                .ok_or("--cost-of-debt is required (or provide --input)")?,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            debt_weight: args
                .debt_weight
                .ok_or("--debt-weight is required (or provide --input)")?,
            equity_weight: args
                .equity_weight
                .ok_or("--equity-weight is required (or provide --input)")?,
            size_premium: args.size_premium,
            country_risk_premium: args.country_risk,
            specific_risk_premium: args.specific_risk,
        }
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis = load_scenario_input(&args)?;
    tracing::info!(
        scenarios = analysis.scenarios.len(),
        years = analysis.assumptions.projection_years,
        "running scenario analysis"
    );

    let result = dcf::run_scenario_analysis(&analysis)?;
    Ok(serde_json::to_value(result)?)
}

/// Input file, then piped stdin, then preset, then individual flags.
fn load_scenario_input(
    args: &DcfArgs,
) -> Result<ScenarioAnalysisInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return input::file::read_input(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    if let Some(Preset::Reference) = args.preset {
        return Ok(presets::reference_case());
    }
    scenario_input_from_flags(args)
}

fn scenario_input_from_flags(
    args: &DcfArgs,
) -> Result<ScenarioAnalysisInput, Box<dyn std::error::Error>> {
    let scenarios = if args.scenarios.is_empty() {
        vec![Scenario::new(
            "Base",
            args.growth_rate
                .ok_or("--growth-rate or --scenario is required (or provide --input / --preset)")?,
            args.ebitda_margin
                .ok_or("--ebitda-margin or --scenario is required (or provide --input / --preset)")?,
        )]
    } else {
        args.scenarios.clone()
    };

    let assumptions = ValuationAssumptions {
        base_revenue: args
            .base_revenue
            .ok_or("--base-revenue is required (or provide --input / --preset)")?,
        projection_years: args.years,
        tax_rate: args
            .tax_rate
            .ok_or("--tax-rate is required (or provide --input / --preset)")?,
        capex_ratio: args.capex_ratio,
        depreciation_ratio: args.depreciation_ratio,
        change_in_working_capital_ratio: args.working_capital_ratio,
        discount_rate: args
            .discount_rate
            .ok_or("--discount-rate is required (or provide --input / --preset)")?,
        terminal_growth_rate: args
            .terminal_growth
            .ok_or("--terminal-growth is required (or provide --input / --preset)")?,
        net_debt: args.net_debt,
        shares_outstanding: args.shares,
        mid_year_convention: args.mid_year,
        currency: Currency::default(),
        wacc_build_up: None,
    };

    Ok(ScenarioAnalysisInput {
        scenarios,
        assumptions,
    })
}

/// Parse NAME:GROWTH:MARGIN.
pub fn parse_scenario(raw: &str) -> Result<Scenario, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [name, growth, margin] = parts.as_slice() else {
        return Err(format!("expected NAME:GROWTH:MARGIN, got '{raw}'"));
    };
    if name.trim().is_empty() {
        return Err("scenario name must not be empty".into());
    }
    let growth: Decimal = growth
        .trim()
        .parse()
        .map_err(|e| format!("invalid growth rate '{growth}': {e}"))?;
    let margin: Decimal = margin
        .trim()
        .parse()
        .map_err(|e| format!("invalid EBITDA margin '{margin}': {e}"))?;
    Ok(Scenario::new(name.trim(), growth, margin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario() {
        let s = parse_scenario("Bull:0.20:0.40").unwrap();
        assert_eq!(s.name, "Bull");
        assert_eq!(s.revenue_growth_rate, dec!(0.20));
        assert_eq!(s.ebitda_margin, dec!(0.40));
    }

    #[test]
    fn test_parse_scenario_negative_growth() {
        let s = parse_scenario("Bear:-0.05:0.30").unwrap();
        assert_eq!(s.revenue_growth_rate, dec!(-0.05));
    }

    #[test]
    fn test_parse_scenario_rejects_wrong_arity() {
        assert!(parse_scenario("Bull:0.20").is_err());
        assert!(parse_scenario(":0.1:0.2").is_err());
        assert!(parse_scenario("Bull:abc:0.2").is_err());
    }
}
