use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use dcf_valuation_core::valuation::{dcf, peers, presets, scenario, wacc};

fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// One scenario plus the shared assumptions, for single-scenario calls.
#[derive(Deserialize)]
struct SingleScenarioInput {
    scenario: scenario::Scenario,
    assumptions: scenario::ValuationAssumptions,
}

// ---------------------------------------------------------------------------
// Scenario DCF
// ---------------------------------------------------------------------------

#[napi]
pub fn run_scenario_analysis(input_json: String) -> NapiResult<String> {
    let input: dcf::ScenarioAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf::run_scenario_analysis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Same result set as `runScenarioAnalysis` without the envelope, with
/// scenarios valued on the rayon pool.
#[napi]
pub fn evaluate_scenarios(input_json: String) -> NapiResult<String> {
    let input: dcf::ScenarioAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let results = dcf::evaluate_all_parallel(&input.scenarios, &input.assumptions)
        .map_err(to_napi_error)?;
    serde_json::to_string(&results).map_err(to_napi_error)
}

#[napi]
pub fn evaluate_scenario(input_json: String) -> NapiResult<String> {
    let input: SingleScenarioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let result = dcf::evaluate(&input.scenario, &input.assumptions).map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[napi]
pub fn project_cash_flows(input_json: String) -> NapiResult<String> {
    let input: SingleScenarioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let rows =
        dcf::project_cash_flows(&input.scenario, &input.assumptions).map_err(to_napi_error)?;
    serde_json::to_string(&rows).map_err(to_napi_error)
}

#[napi]
pub fn reference_case() -> NapiResult<String> {
    serde_json::to_string(&presets::reference_case()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

#[napi]
pub fn summarize_peers(input_json: String) -> NapiResult<String> {
    let records: Vec<peers::PeerRecord> =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let summary = peers::summarize(&records).map_err(to_napi_error)?;
    serde_json::to_string(&summary).map_err(to_napi_error)
}

#[napi]
pub fn peer_analysis(input_json: String) -> NapiResult<String> {
    let input: peers::PeerAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = peers::run_peer_analysis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Discount rate
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_wacc(input_json: String) -> NapiResult<String> {
    let input: wacc::WaccInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = wacc::calculate_wacc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
