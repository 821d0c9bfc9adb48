use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use log::info;
use mjfit_multijet::SkippedBin;
use serde::Serialize;

use super::{
    load_correction, load_measurement, load_nuisances, write_json, CorrectionArgs,
    LoadedMeasurement, MeasurementArgs,
};

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub measurement: MeasurementArgs,
    #[command(flatten)]
    pub correction: CorrectionArgs,
    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct EvalReport {
    method: String,
    input_sha256: String,
    trigger_bins: Vec<String>,
    dimensionality: usize,
    chi2: f64,
    bins_used: usize,
    skipped: Vec<SkippedBin>,
}

pub fn run(args: &EvalArgs) -> Result<(), Box<dyn Error>> {
    let LoadedMeasurement {
        mut measurement,
        input_sha256,
    } = load_measurement(&args.measurement)?;
    let corrector = load_correction(args.correction.correction.as_deref())?;
    let nuisances = load_nuisances(args.correction.nuisances.as_deref())?;

    let result = measurement.evaluate(corrector.as_ref(), &nuisances)?;
    info!(
        "chi2 = {:.6} over {} of {} bins",
        result.chi2,
        result.bins_used,
        measurement.dimensionality()
    );

    let report = EvalReport {
        method: measurement.method().to_string(),
        input_sha256,
        trigger_bins: measurement.trigger_bins()[measurement.selected_range()]
            .iter()
            .map(|bin| bin.name().to_string())
            .collect(),
        dimensionality: measurement.dimensionality(),
        chi2: result.chi2,
        bins_used: result.bins_used,
        skipped: result.skipped,
    };
    write_json(args.out.as_deref(), &report)
}
