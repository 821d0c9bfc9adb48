use mjfit_core::errors::{ErrorInfo, MjfitError};
use serde::{Deserialize, Serialize};

use crate::hist::{Axis, Hist1D, Hist2D, Profile};

/// Inputs of one trigger bin, as read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerBinInputs {
    /// Name of the trigger bin.
    pub name: String,
    /// Mean balance observable in data, in bins of leading-jet pt.
    pub bal_profile: Profile,
    /// Mean balance observable in simulation; its binning defines the chi^2 bins.
    pub sim_bal_profile: Profile,
    /// Number of events per bin of leading-jet pt.
    pub pt_lead: Hist1D,
    /// Mean leading-jet pt per bin of leading-jet pt.
    pub pt_lead_profile: Profile,
    /// Sum of projections of jet pt, in bins of leading-jet pt (x) and jet pt (y).
    pub pt_jet_sum_proj: Hist2D,
}

/// Data of a single trigger bin prepared for repeated recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerBin {
    name: String,
    binning: Axis,
    bal_profile: Profile,
    bal_rebinned: Profile,
    sim_bal_profile: Profile,
    pt_lead: Hist1D,
    pt_lead_profile: Profile,
    pt_jet_sum_proj: Hist2D,
    total_unc2: Vec<f64>,
}

fn check_binning(name: &str, object: &str, axis: &Axis, reference: &Axis) -> Result<(), MjfitError> {
    if axis.same_binning(reference) {
        return Ok(());
    }
    Err(MjfitError::Input(
        ErrorInfo::new(
            "binning-mismatch",
            "data histograms of a trigger bin must share the binning of PtLead",
        )
        .with_context("trigger_bin", name)
        .with_context("object", object),
    ))
}

impl TriggerBin {
    /// Builds a trigger bin, rebinning the data profile onto the simulation binning to
    /// compute the combined uncertainty of every chi^2 bin.
    pub fn new(inputs: TriggerBinInputs) -> Result<Self, MjfitError> {
        let TriggerBinInputs {
            name,
            bal_profile,
            sim_bal_profile,
            pt_lead,
            pt_lead_profile,
            pt_jet_sum_proj,
        } = inputs;

        let binning = pt_lead.axis().clone();
        check_binning(&name, "balance profile", bal_profile.axis(), &binning)?;
        check_binning(&name, "PtLeadProfile", pt_lead_profile.axis(), &binning)?;
        check_binning(&name, "PtJetSumProj", pt_jet_sum_proj.x_axis(), &binning)?;

        let bal_rebinned = bal_profile
            .rebin_aligned(sim_bal_profile.axis())
            .map_err(|err| match err {
                MjfitError::Input(info) => MjfitError::Input(info.with_context("trigger_bin", &name)),
                other => other,
            })?;

        let total_unc2 = (0..sim_bal_profile.axis().n_bins())
            .map(|bin| sim_bal_profile.error(bin).powi(2) + bal_rebinned.error(bin).powi(2))
            .collect();

        Ok(Self {
            name,
            binning,
            bal_profile,
            bal_rebinned,
            sim_bal_profile,
            pt_lead,
            pt_lead_profile,
            pt_jet_sum_proj,
            total_unc2,
        })
    }

    /// Name of the trigger bin.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binning in leading-jet pt shared by all data histograms.
    pub fn binning(&self) -> &Axis {
        &self.binning
    }

    /// Binning of the chi^2 bins, in corrected leading-jet pt.
    pub fn target_binning(&self) -> &Axis {
        self.sim_bal_profile.axis()
    }

    /// Number of chi^2 bins.
    pub fn n_target_bins(&self) -> usize {
        self.sim_bal_profile.axis().n_bins()
    }

    /// Mean balance observable in data, in the data binning.
    pub fn bal_profile(&self) -> &Profile {
        &self.bal_profile
    }

    /// Data profile rebinned onto the simulation binning.
    pub fn bal_rebinned(&self) -> &Profile {
        &self.bal_rebinned
    }

    /// Reference profile in simulation.
    pub fn sim_bal_profile(&self) -> &Profile {
        &self.sim_bal_profile
    }

    /// Event counts per data bin.
    pub fn pt_lead(&self) -> &Hist1D {
        &self.pt_lead
    }

    /// Mean leading-jet pt per data bin.
    pub fn pt_lead_profile(&self) -> &Profile {
        &self.pt_lead_profile
    }

    /// Jet pt sums in bins of leading-jet pt and jet pt.
    pub fn pt_jet_sum_proj(&self) -> &Hist2D {
        &self.pt_jet_sum_proj
    }

    /// Squared combined data and simulation uncertainty per chi^2 bin.
    pub fn total_unc2(&self) -> &[f64] {
        &self.total_unc2
    }
}
