use mjfit_core::errors::MjfitError;
use serde::{Deserialize, Serialize};

use crate::hist::validate_edges;

/// Coarse bin paired with the fraction of its width included in an overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FracBin {
    /// Zero-based index of the coarse bin.
    pub index: usize,
    /// Included fraction of the bin width, in `[0, 1]`.
    pub frac: f64,
}

impl FracBin {
    /// Creates a fractional bin.
    pub fn new(index: usize, frac: f64) -> Self {
        Self { index, frac }
    }
}

/// Range of coarse bins covered by one target bin.
///
/// `start` stores the fraction of its coarse bin above the lower target edge and `end` the
/// fraction below the upper target edge. Both may reference the same coarse bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FracRange {
    /// Coarse bin containing the lower target edge.
    pub start: FracBin,
    /// Coarse bin containing the upper target edge.
    pub end: FracBin,
}

impl FracRange {
    /// Inclusion fraction of a coarse bin inside the range.
    ///
    /// Bins strictly between the endpoints are fully included. When both endpoints share a
    /// bin the lower fraction is used; for a weighted mean over a single bin any positive
    /// weight gives the same result.
    pub fn fraction(&self, index: usize) -> f64 {
        if index == self.start.index {
            self.start.frac
        } else if index == self.end.index {
            self.end.frac
        } else {
            1.0
        }
    }

    /// Coarse bin indices spanned by the range.
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start.index..=self.end.index
    }
}

/// Map from target bins to the coarse bins they overlap.
///
/// Entry `0` is the target underflow `(-inf, t_0)` and the last entry the target overflow
/// `(t_n, +inf)`; entries `1..=n` are the target bins proper. An entry is `None` when the
/// target bin does not overlap the coarse range at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMap {
    entries: Vec<Option<FracRange>>,
}

impl BinMap {
    /// Number of target bins, excluding under- and overflow.
    pub fn n_target_bins(&self) -> usize {
        self.entries.len() - 2
    }

    /// Entry in under/overflow-inclusive numbering.
    pub fn get(&self, entry: usize) -> Option<&FracRange> {
        self.entries.get(entry).and_then(Option::as_ref)
    }

    /// Entry for the target underflow.
    pub fn underflow(&self) -> Option<&FracRange> {
        self.get(0)
    }

    /// Entry for the target overflow.
    pub fn overflow(&self) -> Option<&FracRange> {
        self.get(self.entries.len() - 1)
    }

    /// Target bins proper, as `(zero-based target bin, range)`, dropping under- and overflow.
    pub fn interior(&self) -> impl Iterator<Item = (usize, Option<&FracRange>)> + '_ {
        let n = self.n_target_bins();
        self.entries[1..=n]
            .iter()
            .enumerate()
            .map(|(bin, entry)| (bin, entry.as_ref()))
    }
}

fn lower_boundary(coarse: &[f64], x: f64) -> Option<FracBin> {
    let n = coarse.len() - 1;
    let k = coarse.partition_point(|&edge| edge <= x);
    if k == 0 {
        // Edge below the coarse range: the first bin is fully included.
        Some(FracBin::new(0, 1.0))
    } else if k > n {
        None
    } else {
        let bin = k - 1;
        let width = coarse[k] - coarse[bin];
        Some(FracBin::new(bin, (coarse[k] - x) / width))
    }
}

fn upper_boundary(coarse: &[f64], x: f64) -> Option<FracBin> {
    let n = coarse.len() - 1;
    // Upper boundaries belong to the bin below when they sit exactly on an edge.
    let k = coarse.partition_point(|&edge| edge < x);
    if k == 0 {
        None
    } else if k > n {
        Some(FracBin::new(n - 1, 1.0))
    } else {
        let bin = k - 1;
        let width = coarse[k] - coarse[bin];
        Some(FracBin::new(bin, (x - coarse[bin]) / width))
    }
}

fn overlap(coarse: &[f64], low: f64, high: f64) -> Option<FracRange> {
    let start = lower_boundary(coarse, low)?;
    let end = upper_boundary(coarse, high)?;
    (start.index <= end.index).then_some(FracRange { start, end })
}

/// Maps every target bin onto the coarse bins it overlaps.
///
/// Both binnings must be finite and strictly increasing; the target edges are expected in
/// the coordinate of the coarse binning.
pub fn map_binning(coarse: &[f64], target: &[f64]) -> Result<BinMap, MjfitError> {
    validate_edges(coarse)?;
    validate_edges(target)?;

    let mut entries = Vec::with_capacity(target.len() + 1);
    entries.push(overlap(coarse, f64::NEG_INFINITY, target[0]));
    for pair in target.windows(2) {
        entries.push(overlap(coarse, pair[0], pair[1]));
    }
    entries.push(overlap(coarse, target[target.len() - 1], f64::INFINITY));
    Ok(BinMap { entries })
}
