use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use mjfit_core::NuisanceSet;

use super::{load_nuisances, write_output};

#[derive(Args, Debug)]
pub struct NuisancesArgs {
    /// Validate and normalise this configuration instead of printing the nominal one.
    #[arg(long)]
    pub check: Option<PathBuf>,
    /// Output YAML file; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &NuisancesArgs) -> Result<(), Box<dyn Error>> {
    let set = match args.check.as_deref() {
        Some(path) => load_nuisances(Some(path))?,
        None => NuisanceSet::multijet_nominal(),
    };
    let yaml = set.to_yaml_string()?;
    write_output(args.out.as_deref(), yaml.as_bytes())
}
