mod common;

use mjfit_core::{JetCorrection, Measurement, ScaleCorrection};
use mjfit_multijet::{
    IdentityCorrection, Method, MultijetBinnedSum, NuisanceSet, Profile, ProfileBin, TriggerBin,
};

use common::{assert_close, build, unit_a, unit_b, unit_inputs, UnitLayout, MIN_PT};

/// Chi^2 of a trigger bin computed from the rebinned data, valid for the identity correction.
fn identity_chi2(layout: &UnitLayout, method: Method, shift: impl Fn(f64) -> f64) -> f64 {
    let measurement = build(std::slice::from_ref(layout), method);
    let trigger_bin = &measurement.trigger_bins()[0];
    let sim = trigger_bin.sim_bal_profile();
    let data = trigger_bin.bal_rebinned();
    (0..trigger_bin.n_target_bins())
        .map(|bin| {
            let pt = sim.axis().center(bin);
            let diff = data.mean(bin) + shift(pt) - sim.mean(bin);
            diff * diff / (sim.error(bin).powi(2) + data.error(bin).powi(2))
        })
        .sum()
}

#[test]
fn identity_chi2_matches_direct_sum() {
    for method in [Method::PtBal, Method::Mpf] {
        let mut measurement = build(&[unit_a(), unit_b()], method);
        let report = measurement
            .evaluate(&IdentityCorrection, &NuisanceSet::multijet_nominal())
            .unwrap();
        let expected =
            identity_chi2(&unit_a(), method, |_| 0.0) + identity_chi2(&unit_b(), method, |_| 0.0);
        assert_close(report.chi2, expected);
        assert_eq!(report.bins_used, 5);
        assert!(report.skipped.is_empty());
        assert!(report.chi2 >= 0.0);
    }
}

#[test]
fn chi2_vanishes_when_simulation_equals_recomputed_data() {
    let single = UnitLayout::uniform("S", 80.0, 220.0, vec![100.0, 200.0], 0.0);
    let mut reference = build(std::slice::from_ref(&single), Method::Mpf);
    reference.recompute(&IdentityCorrection).unwrap();
    let value = reference.recomputed(0).unwrap()[0];

    let matched = UnitLayout { sim_mean: value, ..single };
    let mut measurement = build(&[matched], Method::Mpf);
    let chi2 = measurement
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap();
    assert_eq!(chi2, 0.0);
}

#[test]
fn zero_valued_nuisances_do_not_change_chi2() {
    let correction = ScaleCorrection::new(1.03).unwrap();
    for method in [Method::PtBal, Method::Mpf] {
        let mut measurement = build(&[unit_a(), unit_b()], method);
        let nominal = measurement
            .eval(&correction, &NuisanceSet::multijet_nominal())
            .unwrap();
        let none = measurement.eval(&correction, &NuisanceSet::empty()).unwrap();
        assert_eq!(nominal, none);
    }
}

#[test]
fn nuisance_shift_enters_every_bin() {
    let mut nuisances = NuisanceSet::multijet_nominal();
    nuisances.set("MJB_JEC", 2.0).unwrap();
    let mut measurement = build(&[unit_a()], Method::PtBal);
    let chi2 = measurement.eval(&IdentityCorrection, &nuisances).unwrap();
    let expected = identity_chi2(&unit_a(), Method::PtBal, |_| 0.02);
    assert_close(chi2, expected);

    // MPF nuisances leave pt balance untouched.
    let mut mpf_only = NuisanceSet::multijet_nominal();
    mpf_only.set("MPF_JEC", 5.0).unwrap();
    let unshifted = measurement.eval(&IdentityCorrection, &mpf_only).unwrap();
    assert_close(unshifted, identity_chi2(&unit_a(), Method::PtBal, |_| 0.0));
}

#[test]
fn pt_dependent_nuisance_uses_bin_centre() {
    let mut nuisances = NuisanceSet::multijet_nominal();
    nuisances.set("MPF_FSR", 1.0).unwrap();
    let mut measurement = build(&[unit_a()], Method::Mpf);
    let chi2 = measurement.eval(&IdentityCorrection, &nuisances).unwrap();
    let expected = identity_chi2(&unit_a(), Method::Mpf, |pt| 0.01 * pt.ln() * pt.ln());
    assert_close(chi2, expected);
}

#[test]
fn threshold_underflow_rejects_the_correction() {
    let mut measurement = build(&[unit_a()], Method::PtBal);
    measurement.recompute(&IdentityCorrection).unwrap();
    let before = measurement.recomputed(0).unwrap().to_vec();

    // Undoing a factor of 4 puts the 20 GeV threshold at 5 GeV, below the jet axis.
    let correction = ScaleCorrection::new(4.0).unwrap();
    let err = measurement
        .eval(&correction, &NuisanceSet::multijet_nominal())
        .unwrap_err();
    assert_eq!(err.code(), "threshold-underflow");
    assert!(err.is_invalid_correction());
    assert_eq!(
        err.info().context.get("min_pt").map(String::as_str),
        Some(MIN_PT.to_string().as_str())
    );

    let after = measurement.recomputed(0).unwrap();
    for (lhs, rhs) in before.iter().zip(after) {
        assert_eq!(lhs.to_bits(), rhs.to_bits());
    }
}

#[test]
fn identity_correction_with_threshold_below_jet_axis_underflows() {
    let trigger_bin = TriggerBin::new(unit_inputs(&unit_a(), Method::PtBal)).unwrap();
    // The jet pt axis starts at 10 GeV.
    let mut measurement = MultijetBinnedSum::new(Method::PtBal, 5.0, vec![trigger_bin]).unwrap();
    let err = measurement
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap_err();
    assert_eq!(err.code(), "threshold-underflow");
    assert!(err.is_invalid_correction());
}

/// Scale correction that cannot be inverted from 300 GeV upwards.
struct BrokenAbove300;

impl JetCorrection for BrokenAbove300 {
    fn eval(&self, _pt: f64) -> f64 {
        1.1
    }

    fn undo_corr(&self, pt: f64) -> f64 {
        if pt >= 300.0 {
            f64::NAN
        } else {
            pt / 1.1
        }
    }
}

#[test]
fn failing_inverse_in_a_later_trigger_bin_keeps_earlier_buffers() {
    let mut measurement = build(&[unit_a(), unit_b()], Method::Mpf);
    measurement.recompute(&IdentityCorrection).unwrap();
    let before: Vec<Vec<f64>> = (0..2)
        .map(|index| measurement.recomputed(index).unwrap().to_vec())
        .collect();

    let err = measurement.recompute(&BrokenAbove300).unwrap_err();
    assert_eq!(err.code(), "non-finite-inverse");
    assert_eq!(
        err.info().context.get("trigger_bin").map(String::as_str),
        Some("1")
    );

    for (index, expected) in before.iter().enumerate() {
        let after = measurement.recomputed(index).unwrap();
        for (lhs, rhs) in expected.iter().zip(after) {
            assert_eq!(lhs.to_bits(), rhs.to_bits());
        }
    }

    // The cached maps still match the identity buffers.
    let report = measurement
        .evaluate(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap();
    let expected =
        identity_chi2(&unit_a(), Method::Mpf, |_| 0.0) + identity_chi2(&unit_b(), Method::Mpf, |_| 0.0);
    assert_close(report.chi2, expected);
}

#[test]
fn nan_bins_are_skipped_and_counted() {
    let layout = UnitLayout::uniform("C", 80.0, 220.0, vec![150.0, 220.0, 260.0], 1.0);
    let mut measurement = build(&[unit_a(), layout], Method::Mpf);
    assert_eq!(measurement.dim(), 4);

    let report = measurement
        .evaluate(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap();
    assert_eq!(report.bins_used, 3);
    assert_eq!(report.skipped.len(), 1);
    let skipped = &report.skipped[0];
    assert_eq!((skipped.trigger_bin, skipped.bin), (1, 1));
    assert!(skipped.data_nan);
    assert!(!skipped.sim_nan);
    assert_close(skipped.pt, 240.0);

    measurement
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap();
    assert_eq!(measurement.skipped_bins_total(), 2);
}

#[test]
fn measurement_trait_forwards_to_the_engine() {
    let mut measurement = build(&[unit_a(), unit_b()], Method::PtBal);
    let direct = measurement
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap();
    let dynamic: &mut dyn Measurement = &mut measurement;
    assert_eq!(dynamic.dim(), 5);
    let via_trait = dynamic
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap();
    assert_eq!(direct, via_trait);
}

#[test]
fn repeated_evaluations_are_reproducible() {
    let correction = ScaleCorrection::new(0.98).unwrap();
    let mut measurement = build(&[unit_a(), unit_b()], Method::Mpf);
    let first = measurement
        .eval(&correction, &NuisanceSet::multijet_nominal())
        .unwrap();
    measurement
        .eval(&IdentityCorrection, &NuisanceSet::multijet_nominal())
        .unwrap();
    let again = measurement
        .eval(&correction, &NuisanceSet::multijet_nominal())
        .unwrap();
    assert_eq!(first.to_bits(), again.to_bits());
}

/// Inputs of trigger bin A with equal means and no spread inside the data bins, which leaves
/// no uncertainty after rebinning.
fn zero_uncertainty_inputs() -> mjfit_multijet::TriggerBinInputs {
    let mut inputs = unit_inputs(&unit_a(), Method::Mpf);
    let flatten = |profile: &Profile, mean: f64| {
        let bins = profile
            .bins()
            .iter()
            .map(|bin| ProfileBin {
                mean,
                error: 0.0,
                ..*bin
            })
            .collect();
        Profile::new(profile.axis().clone(), bins).unwrap()
    };
    inputs.sim_bal_profile = flatten(&inputs.sim_bal_profile, 1.0);
    inputs.bal_profile = flatten(&inputs.bal_profile, 0.5);
    inputs
}

#[test]
fn used_bin_without_uncertainty_is_an_error() {
    let trigger_bin = TriggerBin::new(zero_uncertainty_inputs()).unwrap();
    let mut measurement =
        MultijetBinnedSum::new(Method::Mpf, MIN_PT, vec![trigger_bin]).unwrap();
    let err = measurement
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap_err();
    assert_eq!(err.code(), "zero-uncertainty");
}

#[test]
fn bins_skipped_before_a_zero_uncertainty_error_are_counted() {
    let partial = UnitLayout::uniform("C", 80.0, 220.0, vec![150.0, 220.0, 260.0], 1.0);
    let trigger_bins = vec![
        TriggerBin::new(unit_inputs(&partial, Method::Mpf)).unwrap(),
        TriggerBin::new(zero_uncertainty_inputs()).unwrap(),
    ];
    let mut measurement = MultijetBinnedSum::new(Method::Mpf, MIN_PT, trigger_bins).unwrap();
    let err = measurement
        .eval(&IdentityCorrection, &NuisanceSet::empty())
        .unwrap_err();
    assert_eq!(err.code(), "zero-uncertainty");
    assert_eq!(measurement.skipped_bins_total(), 1);
}
