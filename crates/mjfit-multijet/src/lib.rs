#![deny(missing_docs)]
#![doc = "Multijet balance measurement: recomputes the mean balance observable in data for an arbitrary jet correction from binned inputs and compares it to simulation with a chi^2."]

/// Mapping between independent binnings through fractional bin overlaps.
pub mod binning;
/// Chi^2 evaluation across trigger bins.
pub mod engine;
/// Histogram containers.
pub mod hist;
/// Keyed input bundle and its loader.
pub mod input;
/// Recomputation of the mean balance observable for arbitrary corrections.
pub mod recompute;
/// Diagnostic step series.
pub mod series;
/// Canonical JSON reports and their files.
pub mod serde;
/// Per-trigger-bin inputs and derived uncertainties.
pub mod trigger;

pub use binning::{map_binning, BinMap, FracBin, FracRange};
pub use engine::{Chi2Report, MultijetBinnedSum, SkippedBin};
pub use hist::{Axis, AxisPosition, Hist1D, Hist2D, Profile, ProfileBin};
pub use input::{InputFile, StoredObject};
pub use recompute::{compute_balance, compute_mpf, compute_pt_bal};
pub use series::{BinnedSeries, SeriesBin, SeriesKind};
pub use trigger::{TriggerBin, TriggerBinInputs};

pub use mjfit_core::{
    CorrectionSpec, IdentityCorrection, JetCorrection, Measurement, Method, MjfitError,
    NuisanceEntry, NuisanceSet, ShapeFunction,
};
