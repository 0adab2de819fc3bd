//! Reference case: a large-cap semiconductor-equipment maker valued under
//! Base / Bull / Bear cases, with four listed peers.
//!
//! Bull and Bear carry their own capex, working-capital, WACC and
//! terminal-growth assumptions via [`AssumptionOverrides`]. There is no
//! depreciation line, so tax falls on EBITDA.

use rust_decimal_macros::dec;

use crate::types::Currency;

use super::dcf::ScenarioAnalysisInput;
use super::peers::{fill_missing, PeerDefaults, PeerRecord};
use super::scenario::{AssumptionOverrides, Scenario, ValuationAssumptions};

pub const REFERENCE_PEER_TICKERS: [&str; 4] = ["LRCX", "AMAT", "KLAC", "TER"];

pub fn reference_assumptions() -> ValuationAssumptions {
    ValuationAssumptions {
        base_revenue: dec!(20000000000),
        projection_years: 5,
        tax_rate: dec!(0.15),
        capex_ratio: dec!(0.10),
        depreciation_ratio: dec!(0.0),
        change_in_working_capital_ratio: dec!(0.15),
        discount_rate: dec!(0.10),
        terminal_growth_rate: dec!(0.03),
        net_debt: None,
        shares_outstanding: None,
        mid_year_convention: false,
        currency: Currency::EUR,
        wacc_build_up: None,
    }
}

pub fn reference_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("Base", dec!(0.15), dec!(0.35)),
        Scenario::new("Bull", dec!(0.20), dec!(0.40)).with_overrides(AssumptionOverrides {
            capex_ratio: Some(dec!(0.08)),
            change_in_working_capital_ratio: Some(dec!(0.12)),
            discount_rate: Some(dec!(0.09)),
            terminal_growth_rate: Some(dec!(0.04)),
            ..Default::default()
        }),
        Scenario::new("Bear", dec!(0.10), dec!(0.30)).with_overrides(AssumptionOverrides {
            capex_ratio: Some(dec!(0.12)),
            change_in_working_capital_ratio: Some(dec!(0.18)),
            discount_rate: Some(dec!(0.11)),
            terminal_growth_rate: Some(dec!(0.02)),
            ..Default::default()
        }),
    ]
}

pub fn reference_case() -> ScenarioAnalysisInput {
    ScenarioAnalysisInput {
        scenarios: reference_scenarios(),
        assumptions: reference_assumptions(),
    }
}

/// Reference peers with every multiple at its default value, standing in
/// for a market-data snapshot that could not be fetched.
pub fn reference_peers() -> Vec<PeerRecord> {
    let blank: Vec<PeerRecord> = REFERENCE_PEER_TICKERS
        .iter()
        .map(|t| PeerRecord {
            ticker: (*t).to_string(),
            price_to_earnings: None,
            ev_to_ebitda: None,
            price_to_sales: None,
            return_on_equity: None,
        })
        .collect();
    fill_missing(&blank, &PeerDefaults::default())
}
