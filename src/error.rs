//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::curve::CurveError;
use crate::devices::converter::ConverterError;

/// Fatal simulation errors.
///
/// Recoverable situations (incompatible vehicle/charger pairs, queue
/// conflicts) are logged and never reach this type.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("charger `{charger}` {curve} curve: {source}")]
    ChargerCurve {
        charger: String,
        curve: &'static str,
        #[source]
        source: CurveError,
    },
    #[error(transparent)]
    Converter(#[from] ConverterError),
    #[error("duplicate {kind} type `{name}` in inventory")]
    DuplicateType { kind: &'static str, name: String },
    #[error("charger type `{0}` is not in the inventory")]
    UnknownCharger(String),
    #[error("invalid scenario: {}", first_message(.0))]
    InvalidScenario(Vec<ConfigError>),
    #[error("time went backwards: now = {now} is before the previous step at {last}")]
    NonMonotonicTime { last: f64, now: f64 },
}

fn first_message(errors: &[ConfigError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
