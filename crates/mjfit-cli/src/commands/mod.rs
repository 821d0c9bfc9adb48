use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use log::info;
use mjfit_core::{CorrectionSpec, JetCorrection, Method, NuisanceSet};
use mjfit_multijet::serde::{to_canonical_json_bytes, write_canonical_json};
use mjfit_multijet::{InputFile, MultijetBinnedSum};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub mod dim;
pub mod eval;
pub mod nuisances;
pub mod series;
pub mod version;

/// Options selecting the input bundle, the method and the trigger bins.
#[derive(Args, Debug)]
pub struct MeasurementArgs {
    /// JSON bundle with the multijet inputs.
    #[arg(long)]
    pub input: PathBuf,
    /// Balance observable: pt-bal or mpf.
    #[arg(long, default_value = "mpf")]
    pub method: Method,
    /// First trigger bin to include.
    #[arg(long, default_value_t = 0)]
    pub begin: usize,
    /// One past the last trigger bin to include; defaults to all remaining bins.
    #[arg(long)]
    pub end: Option<usize>,
}

/// Options describing the correction and the nuisance values.
#[derive(Args, Debug)]
pub struct CorrectionArgs {
    /// YAML file describing the jet correction; identity when omitted.
    #[arg(long)]
    pub correction: Option<PathBuf>,
    /// YAML file with nuisance values; the nominal set when omitted.
    #[arg(long)]
    pub nuisances: Option<PathBuf>,
}

/// Measurement together with the digest of the bundle it was built from.
pub struct LoadedMeasurement {
    pub measurement: MultijetBinnedSum,
    pub input_sha256: String,
}

pub fn load_measurement(args: &MeasurementArgs) -> Result<LoadedMeasurement, Box<dyn Error>> {
    let bytes = fs::read(&args.input)
        .map_err(|err| format!("failed to read {}: {err}", args.input.display()))?;
    let input_sha256 = format!("{:x}", Sha256::digest(&bytes));
    let input = InputFile::from_json_slice(&bytes)?;

    let mut measurement = MultijetBinnedSum::from_input(&input, args.method)?;
    measurement.set_trigger_bin_range(args.begin, args.end)?;
    info!(
        "loaded {} trigger bins from {} ({} selected, {} chi2 bins)",
        measurement.trigger_bins().len(),
        args.input.display(),
        measurement.selected_range().len(),
        measurement.dimensionality()
    );
    Ok(LoadedMeasurement {
        measurement,
        input_sha256,
    })
}

pub fn load_correction(path: Option<&Path>) -> Result<Box<dyn JetCorrection>, Box<dyn Error>> {
    let spec = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
            serde_yaml::from_str::<CorrectionSpec>(&text)?
        }
        None => CorrectionSpec::default(),
    };
    Ok(spec.build()?)
}

pub fn load_nuisances(path: Option<&Path>) -> Result<NuisanceSet, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
            Ok(NuisanceSet::from_yaml_str(&text)?)
        }
        None => Ok(NuisanceSet::multijet_nominal()),
    }
}

pub fn write_output(out: Option<&Path>, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, bytes)?;
            info!("wrote {}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(bytes)),
    }
    Ok(())
}

/// Writes a canonical JSON report to `out`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(out: Option<&Path>, value: &T) -> Result<(), Box<dyn Error>> {
    match out {
        Some(path) => {
            write_canonical_json(path, value)?;
            info!("wrote {}", path.display());
        }
        None => print!("{}", String::from_utf8(to_canonical_json_bytes(value)?)?),
    }
    Ok(())
}
