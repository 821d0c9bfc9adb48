use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use mjfit_multijet::SeriesKind;

use super::{
    load_correction, load_measurement, load_nuisances, write_json, CorrectionArgs,
    MeasurementArgs,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Data,
    Recomputed,
    Simulation,
}

impl From<KindArg> for SeriesKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Data => SeriesKind::Data,
            KindArg::Recomputed => SeriesKind::Recomputed,
            KindArg::Simulation => SeriesKind::Simulation,
        }
    }
}

#[derive(Args, Debug)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub measurement: MeasurementArgs,
    #[command(flatten)]
    pub correction: CorrectionArgs,
    /// Quantity to export.
    #[arg(long, value_enum, default_value = "recomputed")]
    pub kind: KindArg,
    /// Output JSON file; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &SeriesArgs) -> Result<(), Box<dyn Error>> {
    let mut loaded = load_measurement(&args.measurement)?;
    let corrector = load_correction(args.correction.correction.as_deref())?;
    let nuisances = load_nuisances(args.correction.nuisances.as_deref())?;

    let series = loaded.measurement.recomputed_series(
        corrector.as_ref(),
        &nuisances,
        SeriesKind::from(args.kind),
    )?;
    write_json(args.out.as_deref(), &series)
}
