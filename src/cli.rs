//! Command-line argument parsing for the `evse-sim` binary.

use std::env;
use std::path::PathBuf;

/// Parsed CLI arguments.
#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed_override: Option<u64>,
    pub telemetry_out: Option<PathBuf>,
    pub help: bool,
}

/// Parses the process arguments.
///
/// # Errors
///
/// Returns a message describing the first malformed argument.
pub fn parse_args() -> Result<CliOptions, String> {
    parse_args_from(env::args().skip(1).collect())
}

/// Parses `args` (program name already removed).
///
/// # Errors
///
/// Returns a message for unknown flags, missing values, repeated flags or
/// both `--scenario` and `--preset`.
pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--scenario" => {
                let path = iter.next().ok_or_else(|| {
                    "missing value for --scenario (expected a TOML file path)".to_string()
                })?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                let name = iter.next().ok_or_else(|| {
                    "missing value for --preset (expected a preset name)".to_string()
                })?;
                if opts.preset.replace(name.clone()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "missing value for --seed (expected a u64)".to_string())?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|e| format!("invalid --seed \"{raw}\": {e}"))?;
                opts.seed_override = Some(seed);
            }
            "--telemetry-out" => {
                let path = iter.next().ok_or_else(|| {
                    "missing value for --telemetry-out (expected a file path)".to_string()
                })?;
                if opts.telemetry_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--telemetry-out provided more than once".to_string());
                }
            }
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    Ok(opts)
}

pub fn print_help() {
    eprintln!("evse-sim - single-port EV charging simulator");
    eprintln!();
    eprintln!("Usage: evse-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, managed, fleet)");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export step results to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}
