#![allow(dead_code)]

use mjfit_multijet::{
    Axis, Hist1D, Hist2D, InputFile, Method, MultijetBinnedSum, Profile, ProfileBin, TriggerBin,
    TriggerBinInputs,
};

pub const MIN_PT: f64 = 20.0;
pub const SIM_ERROR: f64 = 0.05;
pub const DATA_ERROR: f64 = 0.02;

/// Jet pt axis shared by all synthetic trigger bins.
pub fn jet_edges() -> Vec<f64> {
    vec![10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 80.0, 120.0]
}

/// Layout of one synthetic trigger bin.
#[derive(Debug, Clone)]
pub struct UnitLayout {
    pub name: String,
    pub coarse: Vec<f64>,
    pub target: Vec<f64>,
    pub sim_mean: f64,
}

impl UnitLayout {
    pub fn new(name: &str, coarse: Vec<f64>, target: Vec<f64>, sim_mean: f64) -> Self {
        Self {
            name: name.to_string(),
            coarse,
            target,
            sim_mean,
        }
    }

    /// Leading-jet bins of width 10 GeV between `low` and `high`.
    pub fn uniform(name: &str, low: f64, high: f64, target: Vec<f64>, sim_mean: f64) -> Self {
        let n = ((high - low) / 10.0).round() as usize;
        let coarse = Axis::uniform(n, low, high).unwrap().edges().to_vec();
        Self::new(name, coarse, target, sim_mean)
    }
}

pub fn events(lead_bin: usize) -> f64 {
    100.0 + 10.0 * lead_bin as f64
}

pub fn mean_pt_lead(coarse: &[f64], lead_bin: usize) -> f64 {
    0.5 * (coarse[lead_bin] + coarse[lead_bin + 1]) + 1.0
}

pub fn jet_row(coarse: &[f64], lead_bin: usize) -> Vec<f64> {
    let edges = jet_edges();
    let n_jet = edges.len() - 1;
    let scale = events(lead_bin) * mean_pt_lead(coarse, lead_bin) * 0.01;
    (0..n_jet)
        .map(|jet_bin| scale * (1.0 + jet_bin as f64) / n_jet as f64)
        .collect()
}

pub fn mpf_mean(lead_bin: usize) -> f64 {
    0.95 + 0.002 * lead_bin as f64
}

/// Sum of a jet-pt row above `threshold`, computed by a linear scan of the jet axis.
pub fn jet_sum_above(row: &[f64], threshold: f64, weight: impl Fn(f64) -> f64) -> f64 {
    let edges = jet_edges();
    let mut sum = 0.0;
    for (bin, &s) in row.iter().enumerate() {
        let (lo, hi) = (edges[bin], edges[bin + 1]);
        let centre = 0.5 * (lo + hi);
        if threshold >= hi {
            continue;
        }
        let frac = if threshold >= lo {
            (hi - threshold) / (hi - lo)
        } else {
            1.0
        };
        sum += weight(centre) * s * frac;
    }
    sum
}

fn pt_bal_mean(coarse: &[f64], lead_bin: usize) -> f64 {
    let row = jet_row(coarse, lead_bin);
    -jet_sum_above(&row, MIN_PT, |_| 1.0) / (mean_pt_lead(coarse, lead_bin) * events(lead_bin))
}

/// Inputs of a trigger bin whose data profile agrees with the recomputation for the identity
/// correction.
pub fn unit_inputs(layout: &UnitLayout, method: Method) -> TriggerBinInputs {
    let axis = Axis::new(layout.coarse.clone()).unwrap();
    let n = axis.n_bins();

    let bal_bins = (0..n)
        .map(|bin| ProfileBin {
            mean: match method {
                Method::PtBal => pt_bal_mean(&layout.coarse, bin),
                Method::Mpf => mpf_mean(bin),
            },
            entries: events(bin),
            error: DATA_ERROR,
        })
        .collect();
    let lead_bins = (0..n)
        .map(|bin| ProfileBin {
            mean: mean_pt_lead(&layout.coarse, bin),
            entries: events(bin),
            error: 0.1,
        })
        .collect();

    let target = Axis::new(layout.target.clone()).unwrap();
    let sim_bins = vec![
        ProfileBin {
            mean: layout.sim_mean,
            entries: 1000.0,
            error: SIM_ERROR,
        };
        target.n_bins()
    ];

    TriggerBinInputs {
        name: layout.name.clone(),
        bal_profile: Profile::new(axis.clone(), bal_bins).unwrap(),
        sim_bal_profile: Profile::new(target, sim_bins).unwrap(),
        pt_lead: Hist1D::new(axis.clone(), (0..n).map(events).collect()).unwrap(),
        pt_lead_profile: Profile::new(axis.clone(), lead_bins).unwrap(),
        pt_jet_sum_proj: Hist2D::from_rows(
            axis,
            Axis::new(jet_edges()).unwrap(),
            (0..n).map(|bin| jet_row(&layout.coarse, bin)).collect(),
        )
        .unwrap(),
    }
}

/// Trigger bin A: leading-jet pt 80 to 220 GeV, chi^2 bins [100, 150, 200].
pub fn unit_a() -> UnitLayout {
    UnitLayout::uniform("A", 80.0, 220.0, vec![100.0, 150.0, 200.0], 1.0)
}

/// Trigger bin B: leading-jet pt 200 to 400 GeV, chi^2 bins [250, 300, 350, 400].
pub fn unit_b() -> UnitLayout {
    UnitLayout::uniform("B", 200.0, 400.0, vec![250.0, 300.0, 350.0, 400.0], 0.97)
}

pub fn build(layouts: &[UnitLayout], method: Method) -> MultijetBinnedSum {
    let trigger_bins = layouts
        .iter()
        .map(|layout| TriggerBin::new(unit_inputs(layout, method)).unwrap())
        .collect();
    MultijetBinnedSum::new(method, MIN_PT, trigger_bins).unwrap()
}

pub fn input_file(layouts: &[UnitLayout], method: Method) -> InputFile {
    let mut input = InputFile::default();
    input.set_threshold(method, MIN_PT);
    for layout in layouts {
        input.push_trigger_bin(method, unit_inputs(layout, method));
    }
    input
}

pub fn assert_close(actual: f64, expected: f64) {
    let tol = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual}"
    );
}
