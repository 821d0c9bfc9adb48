#![deny(missing_docs)]
#![doc = "Core traits and data types for mjfit: the error taxonomy, the jet correction capability, nuisance parameters and the measurement contract used by fit drivers."]

pub mod correction;
pub mod errors;
pub mod nuisance;

pub use correction::{
    CorrectionSpec, IdentityCorrection, JetCorrection, LogPolyCorrection, ScaleCorrection,
};
pub use errors::{ErrorInfo, MjfitError};
pub use nuisance::{Method, NuisanceEntry, NuisanceSet, ShapeFunction};

/// Contract between a measurement and the fit driver minimising its deviation.
///
/// `eval` takes `&mut self` so that measurements may keep working buffers across calls.
pub trait Measurement {
    /// Number of independent bins contributing to the deviation.
    fn dim(&self) -> usize;

    /// Deviation of data from expectation for the given correction and nuisances.
    fn eval(
        &mut self,
        corrector: &dyn JetCorrection,
        nuisances: &NuisanceSet,
    ) -> Result<f64, MjfitError>;
}
