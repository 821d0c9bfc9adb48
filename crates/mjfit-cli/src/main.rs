use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    dim::{self, DimArgs},
    eval::{self, EvalArgs},
    nuisances::{self, NuisancesArgs},
    series::{self, SeriesArgs},
    version::{self, VersionArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "mjfit", about = "Multijet balance chi^2 for jet corrections")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the chi^2 for a correction and nuisance values.
    Eval(EvalArgs),
    /// Export data, recomputed or simulated balance as a step series.
    Series(SeriesArgs),
    /// Print the number of chi^2 bins in the selected trigger bins.
    Dim(DimArgs),
    /// Print the nominal nuisance configuration or normalise a given one.
    Nuisances(NuisancesArgs),
    /// Print version information.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Eval(args) => eval::run(&args),
        Command::Series(args) => series::run(&args),
        Command::Dim(args) => dim::run(&args),
        Command::Nuisances(args) => nuisances::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
