pub mod dcf;
pub mod peers;
pub mod presets;
pub mod scenario;
pub mod wacc;

pub use dcf::{
    compute_terminal_value, discount_to_present, evaluate, evaluate_all, project_cash_flows,
    run_scenario_analysis, ProjectionRow, ScenarioAnalysisInput, ValuationResult,
};
#[cfg(feature = "parallel")]
pub use dcf::evaluate_all_parallel;
pub use peers::{summarize, PeerRecord, PeerSummaryStatistics};
pub use scenario::{AssumptionOverrides, Scenario, ValuationAssumptions};
