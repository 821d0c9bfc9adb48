//! Recomputation of the mean balance observable in data for an arbitrary jet correction.
//!
//! Both methods loop over data bins in leading-jet pt covered by a [`FracRange`] and sum the
//! projections of the other jets starting from the bin holding the (uncorrected) jet
//! threshold. The threshold bin is only partly included; when the threshold is above the
//! jet-pt axis no other jets contribute.

use mjfit_core::{JetCorrection, Method};

use crate::binning::{FracBin, FracRange};
use crate::trigger::TriggerBin;

/// Sum over other jets in one leading-jet bin, each jet-pt bin weighted by `weight(pt)`.
fn sum_jets(
    trigger_bin: &TriggerBin,
    lead_bin: usize,
    jet_start: Option<&FracBin>,
    weight: impl Fn(f64) -> f64,
) -> f64 {
    let Some(jet_start) = jet_start else {
        return 0.0;
    };
    let proj = trigger_bin.pt_jet_sum_proj();
    let axis = proj.y_axis();
    let row = proj.row(lead_bin);

    let mut sum = weight(axis.center(jet_start.index)) * row[jet_start.index] * jet_start.frac;
    for (jet_bin, &s) in row.iter().enumerate().skip(jet_start.index + 1) {
        sum += weight(axis.center(jet_bin)) * s;
    }
    sum
}

/// Recomputes pt balance in data for the given range in leading-jet pt.
///
/// Returns NaN when the range holds no events.
pub fn compute_pt_bal(
    trigger_bin: &TriggerBin,
    range: &FracRange,
    jet_start: Option<&FracBin>,
    corrector: &dyn JetCorrection,
) -> f64 {
    let mut sum_bal = 0.0;
    let mut sum_weight = 0.0;

    for lead_bin in range.indices() {
        let num_events = trigger_bin.pt_lead().content(lead_bin);
        if num_events == 0.0 {
            continue;
        }
        let pt_lead = trigger_bin.pt_lead_profile().mean(lead_bin);
        let sum_jets = sum_jets(trigger_bin, lead_bin, jet_start, |pt| corrector.eval(pt));
        let fraction = range.fraction(lead_bin);

        sum_bal += sum_jets / (pt_lead * corrector.eval(pt_lead)) * fraction;
        sum_weight += num_events * fraction;
    }

    if sum_weight == 0.0 {
        return f64::NAN;
    }
    -sum_bal / sum_weight
}

/// Recomputes MPF in data for the given range in leading-jet pt.
///
/// Returns NaN when the range holds no events.
pub fn compute_mpf(
    trigger_bin: &TriggerBin,
    range: &FracRange,
    jet_start: Option<&FracBin>,
    corrector: &dyn JetCorrection,
) -> f64 {
    let mut sum_bal = 0.0;
    let mut sum_weight = 0.0;

    for lead_bin in range.indices() {
        let num_events = trigger_bin.pt_lead().content(lead_bin);
        if num_events == 0.0 {
            continue;
        }
        let pt_lead = trigger_bin.pt_lead_profile().mean(lead_bin);
        let corr_lead = corrector.eval(pt_lead);
        let sum_jets = sum_jets(trigger_bin, lead_bin, jet_start, |pt| 1.0 - corrector.eval(pt));
        let fraction = range.fraction(lead_bin);

        sum_bal += trigger_bin.bal_profile().mean(lead_bin) * num_events / corr_lead * fraction;
        sum_bal += sum_jets / (pt_lead * corr_lead) * fraction;
        sum_weight += num_events * fraction;
    }

    if sum_weight == 0.0 {
        return f64::NAN;
    }
    sum_bal / sum_weight
}

/// Dispatches to the recomputation of the given method.
pub fn compute_balance(
    method: Method,
    trigger_bin: &TriggerBin,
    range: &FracRange,
    jet_start: Option<&FracBin>,
    corrector: &dyn JetCorrection,
) -> f64 {
    match method {
        Method::PtBal => compute_pt_bal(trigger_bin, range, jet_start, corrector),
        Method::Mpf => compute_mpf(trigger_bin, range, jet_start, corrector),
    }
}
