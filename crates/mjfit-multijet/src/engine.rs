use std::ops::Range;

use log::{debug, warn};
use mjfit_core::errors::{ErrorInfo, MjfitError};
use mjfit_core::{JetCorrection, Measurement, Method, NuisanceSet};
use serde::{Deserialize, Serialize};

use crate::binning::{map_binning, BinMap, FracBin};
use crate::hist::AxisPosition;
use crate::recompute::compute_balance;
use crate::series::{BinnedSeries, SeriesBin, SeriesKind};
use crate::trigger::TriggerBin;

fn evaluation_error(code: &str, message: impl Into<String>) -> ErrorInfo {
    ErrorInfo::new(code, message.into())
}

fn config_error(code: &str, message: impl Into<String>) -> MjfitError {
    MjfitError::Config(ErrorInfo::new(code, message.into()))
}

/// Chi^2 bin left out of the sum because its value is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedBin {
    /// Index of the trigger bin.
    pub trigger_bin: usize,
    /// Zero-based chi^2 bin within the trigger bin.
    pub bin: usize,
    /// Centre of the bin in corrected leading-jet pt.
    pub pt: f64,
    /// Whether the recomputed data value was undefined.
    pub data_nan: bool,
    /// Whether the simulation value was undefined.
    pub sim_nan: bool,
}

/// Outcome of one chi^2 evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chi2Report {
    /// Chi^2 summed over all bins with defined values.
    pub chi2: f64,
    /// Number of bins that entered the sum.
    pub bins_used: usize,
    /// Bins skipped because of undefined values.
    pub skipped: Vec<SkippedBin>,
}

#[derive(Debug, Clone)]
struct CachedMap {
    uncorr_edges: Vec<f64>,
    map: BinMap,
}

/// Per-trigger-bin working buffer owned by the engine.
#[derive(Debug, Clone, Default)]
struct UnitBuffer {
    recomp_bal: Vec<f64>,
    cached_map: Option<CachedMap>,
}

/// Builds the bin map for the current correction, or `None` when the cached map still applies.
fn fresh_map(
    cached: Option<&CachedMap>,
    trigger_bin: &TriggerBin,
    index: usize,
    corrector: &dyn JetCorrection,
) -> Result<Option<CachedMap>, MjfitError> {
    // Simulation bins are in corrected pt; data bins are in uncorrected pt.
    let uncorr_edges: Vec<f64> = trigger_bin
        .target_binning()
        .edges()
        .iter()
        .map(|&pt| corrector.undo_corr(pt))
        .collect();

    if let Some(position) = uncorr_edges.iter().position(|pt| !pt.is_finite()) {
        return Err(MjfitError::Evaluation(
            evaluation_error("non-finite-inverse", "correction cannot be inverted at a bin edge")
                .with_context("trigger_bin", index)
                .with_context("edge", trigger_bin.target_binning().edges()[position]),
        ));
    }

    if cached.is_some_and(|entry| entry.uncorr_edges == uncorr_edges) {
        return Ok(None);
    }
    let map = map_binning(trigger_bin.binning().edges(), &uncorr_edges).map_err(|err| {
        MjfitError::Evaluation(
            evaluation_error(
                "non-monotonic-inverse",
                "inverse-corrected target binning is not a valid binning",
            )
            .with_context("trigger_bin", index)
            .with_context("cause", err.code()),
        )
    })?;
    Ok(Some(CachedMap { uncorr_edges, map }))
}

/// Deviation of multijet data from simulation, recomputed for arbitrary jet corrections.
///
/// Computes
///   chi^2 = sum_i (B^{data}_i + shift_i - B^{sim}_i)^2 / (sigma^{data}_i^2 + sigma^{sim}_i^2),
/// where `B_i` is the mean balance observable in bin `i` of corrected leading-jet pt. The data
/// side is recomputed from binned inputs for every correction; the simulation side is
/// fixed. Nuisance shifts are additive and act on the recomputed data.
///
/// Bins whose recomputed or simulated value is NaN are skipped with a warning instead of
/// failing the evaluation, so a fit keeps running; they are reported in [`Chi2Report`] and
/// counted by [`MultijetBinnedSum::skipped_bins_total`].
#[derive(Debug, Clone)]
pub struct MultijetBinnedSum {
    method: Method,
    trigger_bins: Vec<TriggerBin>,
    selected: Range<usize>,
    min_pt: f64,
    dimensionality: usize,
    buffers: Vec<UnitBuffer>,
    skipped_total: u64,
}

impl MultijetBinnedSum {
    /// Creates the measurement from prepared trigger bins and the jet pt threshold used to
    /// build the inputs.
    pub fn new(
        method: Method,
        min_pt: f64,
        trigger_bins: Vec<TriggerBin>,
    ) -> Result<Self, MjfitError> {
        if trigger_bins.is_empty() {
            return Err(MjfitError::Input(ErrorInfo::new(
                "no-trigger-bins",
                "at least one trigger bin is required",
            )));
        }
        if !min_pt.is_finite() {
            return Err(MjfitError::Input(
                ErrorInfo::new("threshold-shape", "jet pt threshold must be finite")
                    .with_context("min_pt", min_pt),
            ));
        }

        let buffers = trigger_bins
            .iter()
            .map(|bin| UnitBuffer {
                recomp_bal: vec![f64::NAN; bin.n_target_bins()],
                cached_map: None,
            })
            .collect();
        let mut measurement = Self {
            method,
            selected: 0..trigger_bins.len(),
            trigger_bins,
            min_pt,
            dimensionality: 0,
            buffers,
            skipped_total: 0,
        };
        measurement.dimensionality = measurement.count_dimensionality();
        Ok(measurement)
    }

    fn count_dimensionality(&self) -> usize {
        self.trigger_bins[self.selected.clone()]
            .iter()
            .map(TriggerBin::n_target_bins)
            .sum()
    }

    /// Method used to define the balance observable.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Jet pt threshold, in corrected pt.
    pub fn min_pt(&self) -> f64 {
        self.min_pt
    }

    /// All trigger bins, selected or not.
    pub fn trigger_bins(&self) -> &[TriggerBin] {
        &self.trigger_bins
    }

    /// Currently selected range of trigger bins.
    pub fn selected_range(&self) -> Range<usize> {
        self.selected.clone()
    }

    /// Number of chi^2 bins in the selected trigger bins.
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// Number of bins skipped as undefined over the lifetime of the measurement.
    pub fn skipped_bins_total(&self) -> u64 {
        self.skipped_total
    }

    /// Recomputed mean balance from the last recomputation, one value per chi^2 bin.
    pub fn recomputed(&self, trigger_bin: usize) -> Option<&[f64]> {
        self.buffers
            .get(trigger_bin)
            .map(|buffer| buffer.recomp_bal.as_slice())
    }

    /// Restricts the measurement to trigger bins with indices in `[begin, end)`.
    ///
    /// `end` defaults to the number of trigger bins. An invalid range is rejected and the
    /// previous selection kept.
    pub fn set_trigger_bin_range(
        &mut self,
        begin: usize,
        end: Option<usize>,
    ) -> Result<(), MjfitError> {
        let available = self.trigger_bins.len();
        let end = end.unwrap_or(available);

        if begin > available {
            return Err(MjfitError::Config(
                ErrorInfo::new("invalid-range", "starting index exceeds the number of trigger bins")
                    .with_context("begin", begin)
                    .with_context("available", available),
            ));
        }
        if end > available {
            return Err(MjfitError::Config(
                ErrorInfo::new("invalid-range", "ending index exceeds the number of trigger bins")
                    .with_context("end", end)
                    .with_context("available", available),
            ));
        }
        if begin >= end {
            return Err(config_error(
                "invalid-range",
                format!("range [{begin}, {end}) selects nothing"),
            ));
        }

        self.selected = begin..end;
        self.dimensionality = self.count_dimensionality();
        Ok(())
    }

    /// Locates the jet-pt bin holding the uncorrected threshold in one trigger bin.
    fn jet_threshold(
        &self,
        index: usize,
        min_pt_uncorr: f64,
    ) -> Result<Option<FracBin>, MjfitError> {
        let axis = self.trigger_bins[index].pt_jet_sum_proj().y_axis();
        match axis.find(min_pt_uncorr) {
            AxisPosition::Underflow => Err(MjfitError::Evaluation(
                evaluation_error(
                    "threshold-underflow",
                    "with the current correction the jet threshold falls in the underflow bin",
                )
                .with_context("trigger_bin", index)
                .with_context("min_pt", self.min_pt)
                .with_context("min_pt_uncorr", min_pt_uncorr)
                .with_hint("reject this correction"),
            )),
            AxisPosition::Overflow => {
                warn!(
                    "jet threshold {} -> {} GeV is above the jet pt axis of trigger bin {}; \
                     other jets do not contribute",
                    self.min_pt, min_pt_uncorr, index
                );
                Ok(None)
            }
            AxisPosition::Bin(bin) => {
                let included = (min_pt_uncorr - axis.low_edge(bin)) / axis.width(bin);
                Ok(Some(FracBin::new(bin, 1.0 - included)))
            }
        }
    }

    /// Recomputes the mean balance in data for all selected trigger bins.
    ///
    /// Fails without touching the working buffers when the correction moves the jet
    /// threshold below the jet pt axis or cannot be inverted in any selected trigger bin.
    pub fn recompute(&mut self, corrector: &dyn JetCorrection) -> Result<(), MjfitError> {
        let min_pt_uncorr = corrector.undo_corr(self.min_pt);
        if !min_pt_uncorr.is_finite() {
            return Err(MjfitError::Evaluation(
                evaluation_error("non-finite-inverse", "correction cannot be inverted at the jet threshold")
                    .with_context("min_pt", self.min_pt),
            ));
        }

        // Validate every selected trigger bin before any buffer is written.
        let mut prepared = Vec::with_capacity(self.selected.len());
        for index in self.selected.clone() {
            let jet_start = self.jet_threshold(index, min_pt_uncorr)?;
            let fresh = fresh_map(
                self.buffers[index].cached_map.as_ref(),
                &self.trigger_bins[index],
                index,
                corrector,
            )?;
            prepared.push((index, jet_start, fresh));
        }

        for (index, jet_start, fresh) in prepared {
            let trigger_bin = &self.trigger_bins[index];
            let UnitBuffer {
                recomp_bal,
                cached_map,
            } = &mut self.buffers[index];
            if let Some(entry) = fresh {
                *cached_map = Some(entry);
            }
            let Some(CachedMap { map: bin_map, .. }) = cached_map.as_ref() else {
                continue;
            };

            // Under- and overflow of the target binning belong to neighbouring trigger bins.
            for (bin, range) in bin_map.interior() {
                recomp_bal[bin] = match range {
                    Some(range) => compute_balance(
                        self.method,
                        trigger_bin,
                        range,
                        jet_start.as_ref(),
                        corrector,
                    ),
                    None => f64::NAN,
                };
            }
        }

        debug!(
            "recomputed {} balance in trigger bins {:?} (threshold {} -> {} GeV)",
            self.method, self.selected, self.min_pt, min_pt_uncorr
        );
        Ok(())
    }

    /// Evaluates chi^2 with a breakdown of skipped bins.
    pub fn evaluate(
        &mut self,
        corrector: &dyn JetCorrection,
        nuisances: &NuisanceSet,
    ) -> Result<Chi2Report, MjfitError> {
        self.recompute(corrector)?;

        let mut chi2 = 0.0;
        let mut bins_used = 0;
        let mut skipped = Vec::new();

        for index in self.selected.clone() {
            let trigger_bin = &self.trigger_bins[index];
            let sim = trigger_bin.sim_bal_profile();
            let recomp_bal = &self.buffers[index].recomp_bal;

            for (bin, &mean_bal) in recomp_bal.iter().enumerate() {
                let sim_mean_bal = sim.mean(bin);
                let pt = sim.axis().center(bin);

                if mean_bal.is_nan() || sim_mean_bal.is_nan() {
                    warn!(
                        "NaN in bin {} of trigger bin {} (pt {:.1} GeV); skipping it",
                        bin, index, pt
                    );
                    skipped.push(SkippedBin {
                        trigger_bin: index,
                        bin,
                        pt,
                        data_nan: mean_bal.is_nan(),
                        sim_nan: sim_mean_bal.is_nan(),
                    });
                    continue;
                }

                let unc2 = trigger_bin.total_unc2()[bin];
                if unc2.is_nan() || unc2 <= 0.0 {
                    self.skipped_total += skipped.len() as u64;
                    return Err(MjfitError::Evaluation(
                        evaluation_error("zero-uncertainty", "combined uncertainty of a used bin is not positive")
                            .with_context("trigger_bin", index)
                            .with_context("bin", bin)
                            .with_context("unc2", unc2),
                    ));
                }

                let shift = nuisances.shift(self.method, pt);
                chi2 += (mean_bal + shift - sim_mean_bal).powi(2) / unc2;
                bins_used += 1;
            }
        }

        self.skipped_total += skipped.len() as u64;
        if !skipped.is_empty() {
            warn!(
                "{} bins skipped in this evaluation, {} in total",
                skipped.len(),
                self.skipped_total
            );
        }
        debug!("chi2 = {chi2} over {bins_used} bins");

        Ok(Chi2Report {
            chi2,
            bins_used,
            skipped,
        })
    }

    /// Evaluates chi^2 for the given correction and nuisances.
    pub fn eval(
        &mut self,
        corrector: &dyn JetCorrection,
        nuisances: &NuisanceSet,
    ) -> Result<f64, MjfitError> {
        self.evaluate(corrector, nuisances).map(|report| report.chi2)
    }

    /// Builds a series of bins over all selected trigger bins, ordered by lower edge.
    ///
    /// The data and simulation series do not depend on the correction; only the recomputed
    /// series triggers a recomputation.
    pub fn recomputed_series(
        &mut self,
        corrector: &dyn JetCorrection,
        nuisances: &NuisanceSet,
        kind: SeriesKind,
    ) -> Result<BinnedSeries, MjfitError> {
        if kind == SeriesKind::Recomputed {
            self.recompute(corrector)?;
        }

        let mut bins = Vec::with_capacity(self.dimensionality);
        let mut upper_edge = f64::NEG_INFINITY;

        for index in self.selected.clone() {
            let trigger_bin = &self.trigger_bins[index];
            let sim = trigger_bin.sim_bal_profile();
            let axis = sim.axis();

            for bin in 0..axis.n_bins() {
                let (value, error) = match kind {
                    SeriesKind::Data => {
                        let rebinned = trigger_bin.bal_rebinned();
                        (rebinned.mean(bin), rebinned.error(bin))
                    }
                    SeriesKind::Recomputed => {
                        let shift = nuisances.shift(self.method, axis.center(bin));
                        (
                            self.buffers[index].recomp_bal[bin] + shift,
                            trigger_bin.total_unc2()[bin].sqrt(),
                        )
                    }
                    SeriesKind::Simulation => (sim.mean(bin), sim.error(bin)),
                };
                bins.push(SeriesBin {
                    low_edge: axis.low_edge(bin),
                    value,
                    error,
                });
            }
            upper_edge = upper_edge.max(axis.max());
        }

        // Trigger bins are not necessarily ordered in pt.
        bins.sort_by(|lhs, rhs| lhs.low_edge.total_cmp(&rhs.low_edge));
        Ok(BinnedSeries::new(kind, bins, upper_edge))
    }
}

impl Measurement for MultijetBinnedSum {
    fn dim(&self) -> usize {
        self.dimensionality
    }

    fn eval(
        &mut self,
        corrector: &dyn JetCorrection,
        nuisances: &NuisanceSet,
    ) -> Result<f64, MjfitError> {
        MultijetBinnedSum::eval(self, corrector, nuisances)
    }
}
