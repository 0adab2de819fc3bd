use clap::Args;
use serde::Deserialize;
use serde_json::{json, Value};

use dcf_valuation_core::valuation::dcf::{self, ScenarioAnalysisInput};
use dcf_valuation_core::valuation::peers::{self, PeerAnalysisInput, PeerDefaults};
use dcf_valuation_core::valuation::presets;

use super::valuation::Preset;
use crate::input;

/// Arguments for the combined DCF + peer report
#[derive(Args)]
pub struct ReportArgs {
    /// Path to JSON or YAML file with `dcf` and optional `peers` sections
    #[arg(long)]
    pub input: Option<String>,

    /// Use a built-in input set
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,
}

#[derive(Debug, Deserialize)]
struct ReportInput {
    dcf: ScenarioAnalysisInput,
    #[serde(default)]
    peers: Option<PeerAnalysisInput>,
}

/// Scenario valuations and, when peers are supplied, the peer summary.
pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let report: ReportInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else if let Some(Preset::Reference) = args.preset {
        ReportInput {
            dcf: presets::reference_case(),
            peers: Some(PeerAnalysisInput {
                peers: presets::reference_peers(),
                target: None,
                defaults: Some(PeerDefaults::default()),
            }),
        }
    } else {
        return Err("--input or --preset is required for a report".into());
    };

    let dcf_out = dcf::run_scenario_analysis(&report.dcf)?;
    let peers_out = match report.peers {
        Some(ref p) => Some(peers::run_peer_analysis(p)?),
        None => None,
    };

    Ok(json!({
        "dcf": serde_json::to_value(dcf_out)?,
        "peers": serde_json::to_value(peers_out)?,
    }))
}
