use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dcf_valuation_core::valuation::peers::{
    self, PeerAnalysisInput, PeerDefaults, PeerRecord, TargetFundamentals,
};
use dcf_valuation_core::valuation::presets;

use super::valuation::Preset;
use crate::input;

/// Arguments for the peer multiple summary
#[derive(Args)]
pub struct PeersArgs {
    /// Path to JSON or YAML file: either a list of peer records or a
    /// `{ peers, target, defaults }` document
    #[arg(long)]
    pub input: Option<String>,

    /// Use a built-in peer set instead of a file
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Fill missing multiples from the standard fallback values
    #[arg(long)]
    pub fill_defaults: bool,

    /// Target EBITDA, for an implied enterprise value
    #[arg(long)]
    pub target_ebitda: Option<Decimal>,

    /// Target net income, for an implied equity value
    #[arg(long)]
    pub target_net_income: Option<Decimal>,

    /// Target revenue, for an implied equity value
    #[arg(long)]
    pub target_revenue: Option<Decimal>,
}

pub fn run_peers(args: PeersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = if let Some(ref path) = args.input {
        Some(input::file::read_input_value(path)?)
    } else {
        input::stdin::read_stdin()?
    };

    let mut analysis = match (raw, args.preset) {
        (Some(data), _) => peer_input_from_value(data)?,
        (None, Some(Preset::Reference)) => PeerAnalysisInput {
            peers: presets::reference_peers(),
            target: None,
            defaults: None,
        },
        (None, None) => return Err("--input or --preset is required for peer analysis".into()),
    };

    if args.fill_defaults && analysis.defaults.is_none() {
        analysis.defaults = Some(PeerDefaults::default());
    }
    if let Some(target) = target_from_flags(&args) {
        analysis.target = Some(target);
    }

    tracing::info!(peers = analysis.peers.len(), "summarising peer multiples");
    let result = peers::run_peer_analysis(&analysis)?;
    Ok(serde_json::to_value(result)?)
}

/// Accept a bare array of peers or a full analysis document.
pub fn peer_input_from_value(data: Value) -> Result<PeerAnalysisInput, Box<dyn std::error::Error>> {
    if data.is_array() {
        let peers: Vec<PeerRecord> = serde_json::from_value(data)?;
        return Ok(PeerAnalysisInput {
            peers,
            target: None,
            defaults: None,
        });
    }
    Ok(serde_json::from_value(data)?)
}

fn target_from_flags(args: &PeersArgs) -> Option<TargetFundamentals> {
    if args.target_ebitda.is_none()
        && args.target_net_income.is_none()
        && args.target_revenue.is_none()
    {
        return None;
    }
    Some(TargetFundamentals {
        ebitda: args.target_ebitda,
        net_income: args.target_net_income,
        revenue: args.target_revenue,
    })
}
