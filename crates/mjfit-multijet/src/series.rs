use serde::{Deserialize, Serialize};

/// Quantity stored in a [`BinnedSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// Data profile rebinned onto the simulation binning.
    Data,
    /// Recomputed data including nuisance shifts, with the combined uncertainty.
    Recomputed,
    /// Reference profile in simulation.
    Simulation,
}

/// Single bin of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesBin {
    /// Lower edge of the bin.
    pub low_edge: f64,
    /// Value in the bin.
    pub value: f64,
    /// Uncertainty of the value.
    pub error: f64,
}

/// Step-histogram-like series of bins across trigger bins.
///
/// Bins are ordered by lower edge; each bin extends to the lower edge of the next one and the
/// last bin to `upper_edge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedSeries {
    /// Quantity stored in the series.
    pub kind: SeriesKind,
    /// Bins ordered by lower edge.
    pub bins: Vec<SeriesBin>,
    /// Upper edge of the last bin.
    pub upper_edge: f64,
}

impl BinnedSeries {
    /// Creates a series from bins already ordered by lower edge.
    pub fn new(kind: SeriesKind, bins: Vec<SeriesBin>, upper_edge: f64) -> Self {
        Self {
            kind,
            bins,
            upper_edge,
        }
    }

    /// Bin edges, one more than the number of bins.
    pub fn edges(&self) -> Vec<f64> {
        self.bins
            .iter()
            .map(|bin| bin.low_edge)
            .chain(std::iter::once(self.upper_edge))
            .collect()
    }

    /// Values of all bins.
    pub fn values(&self) -> Vec<f64> {
        self.bins.iter().map(|bin| bin.value).collect()
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the series has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}
