//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestep,unix_time,soc,p1_kw,p2_kw,p3_kw,q3_kvar,status,\
                       new_session_started,target_p3_kw";

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Complete simulation step results
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// Empty cells mark an idle port (`soc`) or a step without a setpoint
/// (`target_p3_kw`).
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.timestep.to_string(),
            format!("{:.0}", r.unix_time),
            optional(r.soc, 4),
            format!("{:.4}", r.power.p1_kw),
            format!("{:.4}", r.power.p2_kw),
            format!("{:.4}", r.power.p3_kw),
            format!("{:.4}", r.power.q3_kvar),
            r.status.as_str().to_string(),
            r.new_session_started.to_string(),
            optional(r.target_p3_kw, 4),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.precision$}"))
}
