use dcf_valuation_core::types::Currency;
use dcf_valuation_core::valuation::dcf::{self, ScenarioAnalysisInput};
use dcf_valuation_core::valuation::scenario::{Scenario, ValuationAssumptions};
use dcf_valuation_core::DcfError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn shared_assumptions() -> ValuationAssumptions {
    ValuationAssumptions {
        base_revenue: dec!(1000),
        projection_years: 5,
        tax_rate: dec!(0.25),
        capex_ratio: dec!(0.06),
        depreciation_ratio: dec!(0.05),
        change_in_working_capital_ratio: dec!(0.01),
        discount_rate: dec!(0.10),
        terminal_growth_rate: dec!(0.03),
        net_debt: None,
        shares_outstanding: None,
        mid_year_convention: false,
        currency: Currency::USD,
        wacc_build_up: None,
    }
}

fn bull() -> Scenario {
    Scenario::new("Bull", dec!(0.20), dec!(0.40))
}

fn base() -> Scenario {
    Scenario::new("Base", dec!(0.15), dec!(0.35))
}

fn bear() -> Scenario {
    Scenario::new("Bear", dec!(0.10), dec!(0.30))
}

// ===========================================================================
// Projection
// ===========================================================================

#[test]
fn test_single_year_fcf_build() {
    let mut a = shared_assumptions();
    a.projection_years = 1;

    let rows = dcf::project_cash_flows(&base(), &a).unwrap();
    assert_eq!(rows.len(), 1);

    let y1 = &rows[0];
    assert_eq!(y1.year, 1);
    assert_eq!(y1.revenue, dec!(1150));
    assert_eq!(y1.ebitda, dec!(402.5));
    assert_eq!(y1.depreciation, dec!(57.5));
    assert_eq!(y1.ebit, dec!(345));
    assert_eq!(y1.nopat, dec!(258.75));
    assert_eq!(y1.capex, dec!(69));
    assert_eq!(y1.change_in_working_capital, dec!(11.5));
    assert_eq!(y1.free_cash_flow, dec!(235.75));
}

#[test]
fn test_zero_growth_keeps_revenue_flat() {
    let flat = Scenario::new("Flat", Decimal::ZERO, dec!(0.35));
    let rows = dcf::project_cash_flows(&flat, &shared_assumptions()).unwrap();
    assert!(rows.iter().all(|r| r.revenue == dec!(1000)));
}

#[test]
fn test_non_positive_base_revenue_rejected() {
    let mut a = shared_assumptions();
    a.base_revenue = Decimal::ZERO;
    let err = dcf::project_cash_flows(&base(), &a).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { ref field, .. } if field == "base_revenue"));
}

// ===========================================================================
// Boundaries
// ===========================================================================

#[test]
fn test_discount_equal_to_terminal_growth_is_degenerate() {
    let mut a = shared_assumptions();
    a.terminal_growth_rate = dec!(0.10);
    let err = dcf::evaluate(&base(), &a).unwrap_err();
    assert!(matches!(
        err,
        DcfError::DegenerateTerminalValue {
            discount_rate,
            terminal_growth_rate,
        } if discount_rate == dec!(0.10) && terminal_growth_rate == dec!(0.10)
    ));
}

#[test]
fn test_zero_projection_years_is_invalid() {
    let mut a = shared_assumptions();
    a.projection_years = 0;
    assert!(matches!(
        dcf::evaluate(&base(), &a),
        Err(DcfError::InvalidAssumption { .. })
    ));
}

#[test]
fn test_negative_share_count_is_invalid() {
    let mut a = shared_assumptions();
    a.net_debt = Some(dec!(100));
    a.shares_outstanding = Some(dec!(-5));
    assert!(matches!(
        dcf::evaluate(&base(), &a),
        Err(DcfError::InvalidShareCount(s)) if s == dec!(-5)
    ));
}

// ===========================================================================
// Scenario runs
// ===========================================================================

fn huge_revenue_assumptions(base_revenue: Decimal) -> ValuationAssumptions {
    ValuationAssumptions {
        base_revenue,
        projection_years: 1,
        tax_rate: Decimal::ZERO,
        capex_ratio: Decimal::ZERO,
        depreciation_ratio: Decimal::ZERO,
        change_in_working_capital_ratio: Decimal::ZERO,
        ..shared_assumptions()
    }
}

#[test]
fn test_terminal_value_beyond_decimal_range_is_an_error() {
    // FCF 1e28 grown by (1 + 9) no longer fits in a Decimal
    let mut a = huge_revenue_assumptions(Decimal::from_i128_with_scale(10_i128.pow(28), 0));
    a.discount_rate = dec!(10);
    a.terminal_growth_rate = dec!(9);

    let err = dcf::evaluate(&Scenario::new("X", Decimal::ZERO, Decimal::ONE), &a).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { .. }));
}

#[test]
fn test_free_cash_flow_beyond_decimal_range_is_an_error() {
    let mut a = huge_revenue_assumptions(Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0));
    a.capex_ratio = Decimal::ONE;
    a.change_in_working_capital_ratio = Decimal::ONE;

    let thin = Scenario::new("Thin", Decimal::ZERO, dec!(0.0001));
    let err = dcf::project_cash_flows(&thin, &a).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { ref field, .. } if field.contains("Thin")));
}

#[test]
fn test_equity_bridge_beyond_decimal_range_is_an_error() {
    let mut a = shared_assumptions();
    a.net_debt = Some(Decimal::MIN);

    let err = dcf::evaluate(&base(), &a).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { ref field, .. } if field == "net_debt"));
}

#[test]
fn test_bull_base_bear_strictly_ordered() {
    let results = dcf::evaluate_all(&[bull(), base(), bear()], &shared_assumptions()).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.scenario_name.as_str()).collect();
    assert_eq!(names, vec!["Bull", "Base", "Bear"]);

    assert!(results[0].enterprise_value > results[1].enterprise_value);
    assert!(results[1].enterprise_value > results[2].enterprise_value);
}

#[test]
fn test_evaluate_is_idempotent() {
    let a = shared_assumptions();
    let first = dcf::evaluate(&base(), &a).unwrap();
    let second = dcf::evaluate(&base(), &a).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_evaluate_all_is_order_independent() {
    let a = shared_assumptions();
    let forward = dcf::evaluate_all(&[bull(), bear()], &a).unwrap();
    let reversed = dcf::evaluate_all(&[bear(), bull()], &a).unwrap();

    assert_eq!(forward[0], reversed[1]);
    assert_eq!(forward[1], reversed[0]);
}

#[test]
fn test_evaluate_all_stops_at_first_bad_scenario() {
    let broken = Scenario::new("Broken", dec!(0.05), dec!(0));
    let err = dcf::evaluate_all(&[base(), broken, bear()], &shared_assumptions()).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { ref field, .. } if field.contains("Broken")));
}

#[test]
fn test_enterprise_value_composition() {
    let a = shared_assumptions();
    let result = dcf::evaluate(&base(), &a).unwrap();

    let manual_pv: Decimal = result
        .projection
        .iter()
        .zip(&result.discount_schedule)
        .map(|(row, d)| row.free_cash_flow * d.discount_factor)
        .sum();
    assert_eq!(manual_pv, result.present_value_of_cash_flows);

    let last = result.projection.last().unwrap();
    let tv = dcf::compute_terminal_value(last, &a).unwrap();
    assert_eq!(tv, result.terminal_value);
    assert_eq!(
        result.enterprise_value,
        result.present_value_of_cash_flows + result.discounted_terminal_value
    );
    assert_eq!(result.implied_exit_multiple, tv / last.ebitda);
}

#[test]
fn test_scenario_analysis_from_json() {
    let json = r#"{
        "scenarios": [
            { "name": "Bull", "revenue_growth_rate": "0.20", "ebitda_margin": "0.40" },
            { "name": "Bear", "revenue_growth_rate": "0.10", "ebitda_margin": "0.30",
              "overrides": { "discount_rate": "0.12" } }
        ],
        "assumptions": {
            "base_revenue": "1000",
            "projection_years": 5,
            "tax_rate": "0.25",
            "capex_ratio": "0.06",
            "depreciation_ratio": "0.05",
            "change_in_working_capital_ratio": "0.01",
            "discount_rate": "0.10",
            "terminal_growth_rate": "0.03",
            "net_debt": "150",
            "shares_outstanding": "10"
        }
    }"#;
    let input: ScenarioAnalysisInput = serde_json::from_str(json).unwrap();
    let out = dcf::run_scenario_analysis(&input).unwrap();

    assert_eq!(out.result.results.len(), 2);
    assert_eq!(out.result.results[1].discount_rate_used, dec!(0.12));
    assert_eq!(out.result.lowest_enterprise_value.scenario_name, "Bear");
    assert!(out.result.results[0].implied_price_per_share.is_some());
    assert_eq!(
        out.methodology,
        "Multi-scenario FCFF DCF (Gordon growth terminal value)"
    );
}

// ===========================================================================
// Properties
// ===========================================================================

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    (-5000i64..10_000, 1i64..=10_000).prop_map(|(growth_bp, margin_bp)| {
        Scenario::new(
            format!("g{growth_bp}_m{margin_bp}"),
            Decimal::new(growth_bp, 4),
            Decimal::new(margin_bp, 4),
        )
    })
}

fn arb_assumptions() -> impl Strategy<Value = ValuationAssumptions> {
    (
        1u32..=15,
        1i64..1_000_000,
        0i64..=5000,
        0i64..=3000,
        0i64..=3000,
        0i64..=2000,
        300i64..=2500,
        -200i64..=299,
    )
        .prop_map(
            |(years, revenue, tax_bp, capex_bp, dep_bp, wc_bp, r_bp, g_bp)| ValuationAssumptions {
                base_revenue: Decimal::from(revenue),
                projection_years: years,
                tax_rate: Decimal::new(tax_bp, 4),
                capex_ratio: Decimal::new(capex_bp, 4),
                depreciation_ratio: Decimal::new(dep_bp, 4),
                change_in_working_capital_ratio: Decimal::new(wc_bp, 4),
                discount_rate: Decimal::new(r_bp, 4),
                terminal_growth_rate: Decimal::new(g_bp, 4),
                net_debt: None,
                shares_outstanding: None,
                mid_year_convention: false,
                currency: Currency::USD,
                wacc_build_up: None,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_projection_has_one_row_per_year(s in arb_scenario(), a in arb_assumptions()) {
        let rows = dcf::project_cash_flows(&s, &a).unwrap();
        prop_assert_eq!(rows.len(), a.projection_years as usize);
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(row.year as usize, i + 1);
        }
        if s.revenue_growth_rate > Decimal::ZERO {
            prop_assert!(rows.windows(2).all(|w| w[1].revenue > w[0].revenue));
            prop_assert!(rows[0].revenue > a.base_revenue);
        }
    }

    #[test]
    fn prop_evaluate_is_pure(s in arb_scenario(), a in arb_assumptions()) {
        let first = dcf::evaluate(&s, &a).unwrap();
        let second = dcf::evaluate(&s, &a).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_results_do_not_depend_on_position(
        x in arb_scenario(),
        y in arb_scenario(),
        a in arb_assumptions(),
    ) {
        prop_assume!(x.name != y.name);
        let xy = dcf::evaluate_all(&[x.clone(), y.clone()], &a).unwrap();
        let yx = dcf::evaluate_all(&[y, x], &a).unwrap();
        prop_assert_eq!(&xy[0], &yx[1]);
        prop_assert_eq!(&xy[1], &yx[0]);
    }
}
