//! EVSE simulator entry point: CLI wiring and scenario execution.

use std::process;

use tracing_subscriber::EnvFilter;

use evse_sim::cli::{self, CliOptions};
use evse_sim::config::ScenarioConfig;
use evse_sim::io::export::export_csv;
use evse_sim::runner::run_scenario;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the scenario: `--scenario` takes priority, then `--preset`, then baseline.
fn load_scenario(cli: &CliOptions) -> Result<ScenarioConfig, String> {
    let mut scenario = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path).map_err(|e| e.to_string())?
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name).map_err(|e| e.to_string())?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    Ok(scenario)
}

fn main() {
    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_help();
            process::exit(2);
        }
    };
    if cli.help {
        cli::print_help();
        return;
    }

    init_tracing();

    let scenario = match load_scenario(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let outcome = match run_scenario(&scenario) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    // Print per-step results
    for r in &outcome.results {
        println!("{r}");
    }

    // Print KPI report
    println!("\n{}", outcome.kpi);

    // Export CSV if requested
    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&outcome.results, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {}", path.display());
    }
}
