use std::error::Error;

use clap::Args;

use super::{load_measurement, MeasurementArgs};

#[derive(Args, Debug)]
pub struct DimArgs {
    #[command(flatten)]
    pub measurement: MeasurementArgs,
}

pub fn run(args: &DimArgs) -> Result<(), Box<dyn Error>> {
    let loaded = load_measurement(&args.measurement)?;
    println!("{}", loaded.measurement.dimensionality());
    Ok(())
}
