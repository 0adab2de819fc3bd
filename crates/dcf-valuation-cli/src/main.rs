mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::peers::PeersArgs;
use commands::report::ReportArgs;
use commands::valuation::{DcfArgs, WaccArgs};

/// Scenario DCF valuation and peer multiples
#[derive(Parser)]
#[command(
    name = "dcfv",
    version,
    about = "Scenario DCF valuation and peer multiple summaries",
    long_about = "Values a company under several growth / margin scenarios with a \
                  free-cash-flow DCF and a Gordon growth terminal value, and \
                  summarises peer trading multiples. All arithmetic uses decimal \
                  precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Value one or more scenarios with a DCF
    Dcf(DcfArgs),
    /// Summarise peer trading multiples
    Peers(PeersArgs),
    /// Scenario DCF and peer summary in one document
    Report(ReportArgs),
    /// Derive a discount rate from a CAPM build-up
    Wacc(WaccArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::Peers(args) => commands::peers::run_peers(args),
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Version => {
            println!("dcfv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
