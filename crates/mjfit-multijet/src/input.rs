//! Keyed input bundle holding the binned inputs of a multijet measurement.
//!
//! The bundle mirrors a file of named objects: top-level objects (the jet pt thresholds,
//! `MinPt<Label>`) and an ordered list of named directories, one per trigger bin. Directory
//! order defines trigger bin indices.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use mjfit_core::errors::{ErrorInfo, MjfitError};
use mjfit_core::Method;
use serde::{Deserialize, Serialize};

use crate::engine::MultijetBinnedSum;
use crate::hist::{Hist1D, Hist2D, Profile};
use crate::trigger::{TriggerBin, TriggerBinInputs};

/// Name of the 1D histogram of leading-jet pt.
pub const PT_LEAD: &str = "PtLead";
/// Name of the profile of leading-jet pt.
pub const PT_LEAD_PROFILE: &str = "PtLeadProfile";
/// Name of the 2D histogram of jet pt projections.
pub const PT_JET_SUM_PROJ: &str = "PtJetSumProj";

/// Name of the data balance profile for a method.
pub fn bal_profile_key(method: Method) -> String {
    format!("{}Profile", method.label())
}

/// Name of the simulation balance profile for a method.
pub fn sim_bal_profile_key(method: Method) -> String {
    format!("Sim{}Profile", method.label())
}

/// Name of the jet pt threshold vector for a method.
pub fn threshold_key(method: Method) -> String {
    format!("MinPt{}", method.label())
}

/// Object stored in the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredObject {
    /// Plain vector of numbers.
    Vector {
        /// Stored values.
        values: Vec<f64>,
    },
    /// One-dimensional histogram.
    Hist1d(Hist1D),
    /// Two-dimensional histogram.
    Hist2d(Hist2D),
    /// Profile histogram.
    Profile(Profile),
}

impl StoredObject {
    fn kind(&self) -> &'static str {
        match self {
            StoredObject::Vector { .. } => "vector",
            StoredObject::Hist1d(_) => "hist1d",
            StoredObject::Hist2d(_) => "hist2d",
            StoredObject::Profile(_) => "profile",
        }
    }
}

/// Named objects of one directory.
pub type Directory = IndexMap<String, StoredObject>;

/// Bundle of keyed objects and directories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFile {
    /// Top-level objects.
    #[serde(default)]
    pub objects: IndexMap<String, StoredObject>,
    /// Directories in storage order.
    #[serde(default)]
    pub directories: IndexMap<String, Directory>,
}

fn missing_object(directory: &str, key: &str, expected: &str, found: Option<&str>) -> MjfitError {
    MjfitError::Input(
        ErrorInfo::new("missing-object", "directory does not contain a required object")
            .with_context("directory", directory)
            .with_context("key", key)
            .with_context("expected_kind", expected)
            .with_context("found_kind", found.unwrap_or("none")),
    )
}

fn take_profile(directory: &str, objects: &Directory, key: &str) -> Result<Profile, MjfitError> {
    match objects.get(key) {
        Some(StoredObject::Profile(profile)) => Ok(profile.clone()),
        other => Err(missing_object(
            directory,
            key,
            "profile",
            other.map(StoredObject::kind),
        )),
    }
}

fn take_hist1d(directory: &str, objects: &Directory, key: &str) -> Result<Hist1D, MjfitError> {
    match objects.get(key) {
        Some(StoredObject::Hist1d(hist)) => Ok(hist.clone()),
        other => Err(missing_object(
            directory,
            key,
            "hist1d",
            other.map(StoredObject::kind),
        )),
    }
}

fn take_hist2d(directory: &str, objects: &Directory, key: &str) -> Result<Hist2D, MjfitError> {
    match objects.get(key) {
        Some(StoredObject::Hist2d(hist)) => Ok(hist.clone()),
        other => Err(missing_object(
            directory,
            key,
            "hist2d",
            other.map(StoredObject::kind),
        )),
    }
}

impl InputFile {
    /// Parses a bundle from JSON.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, MjfitError> {
        serde_json::from_slice(data)
            .map_err(|err| MjfitError::Serde(ErrorInfo::new("json-read", err.to_string())))
    }

    /// Reads a bundle from a JSON file.
    pub fn open(path: &Path) -> Result<Self, MjfitError> {
        let bytes = fs::read(path).map_err(|err| {
            MjfitError::Input(
                ErrorInfo::new("open-failed", format!("failed to open input: {err}"))
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_json_slice(&bytes)
    }

    /// Serialises the bundle to pretty JSON, preserving directory order.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, MjfitError> {
        serde_json::to_vec_pretty(self)
            .map_err(|err| MjfitError::Serde(ErrorInfo::new("json-write", err.to_string())))
    }

    /// Stores the jet pt threshold of a method.
    pub fn set_threshold(&mut self, method: Method, min_pt: f64) {
        self.objects.insert(
            threshold_key(method),
            StoredObject::Vector {
                values: vec![min_pt],
            },
        );
    }

    /// Appends a directory holding the inputs of one trigger bin.
    pub fn push_trigger_bin(&mut self, method: Method, inputs: TriggerBinInputs) {
        let mut directory = Directory::new();
        directory.insert(
            sim_bal_profile_key(method),
            StoredObject::Profile(inputs.sim_bal_profile),
        );
        directory.insert(
            bal_profile_key(method),
            StoredObject::Profile(inputs.bal_profile),
        );
        directory.insert(PT_LEAD.to_string(), StoredObject::Hist1d(inputs.pt_lead));
        directory.insert(
            PT_LEAD_PROFILE.to_string(),
            StoredObject::Profile(inputs.pt_lead_profile),
        );
        directory.insert(
            PT_JET_SUM_PROJ.to_string(),
            StoredObject::Hist2d(inputs.pt_jet_sum_proj),
        );
        self.directories.insert(inputs.name, directory);
    }

    /// Reads the jet pt threshold; it must be stored as a single number.
    pub fn threshold(&self, method: Method) -> Result<f64, MjfitError> {
        let key = threshold_key(method);
        match self.objects.get(&key) {
            Some(StoredObject::Vector { values }) if values.len() == 1 => Ok(values[0]),
            other => {
                let found = match other {
                    Some(StoredObject::Vector { values }) => format!("vector of {}", values.len()),
                    Some(object) => object.kind().to_string(),
                    None => "none".to_string(),
                };
                Err(MjfitError::Input(
                    ErrorInfo::new("threshold-shape", "failed to read the jet pt threshold")
                        .with_context("key", key)
                        .with_context("found", found)
                        .with_hint("the threshold must be stored as a vector with one element"),
                ))
            }
        }
    }

    /// Extracts the inputs of every trigger bin for the given method.
    pub fn trigger_bin_inputs(&self, method: Method) -> Result<Vec<TriggerBinInputs>, MjfitError> {
        let bal_key = bal_profile_key(method);
        let sim_key = sim_bal_profile_key(method);
        self.directories
            .iter()
            .map(|(name, objects)| {
                Ok(TriggerBinInputs {
                    name: name.clone(),
                    sim_bal_profile: take_profile(name, objects, &sim_key)?,
                    bal_profile: take_profile(name, objects, &bal_key)?,
                    pt_lead: take_hist1d(name, objects, PT_LEAD)?,
                    pt_lead_profile: take_profile(name, objects, PT_LEAD_PROFILE)?,
                    pt_jet_sum_proj: take_hist2d(name, objects, PT_JET_SUM_PROJ)?,
                })
            })
            .collect()
    }
}

impl MultijetBinnedSum {
    /// Builds the measurement from an input bundle.
    pub fn from_input(input: &InputFile, method: Method) -> Result<Self, MjfitError> {
        let min_pt = input.threshold(method)?;
        let trigger_bins = input
            .trigger_bin_inputs(method)?
            .into_iter()
            .map(TriggerBin::new)
            .collect::<Result<Vec<_>, _>>()?;
        if trigger_bins.is_empty() {
            return Err(MjfitError::Input(ErrorInfo::new(
                "no-trigger-bins",
                "no trigger bins found in the input",
            )));
        }
        Self::new(method, min_pt, trigger_bins)
    }

    /// Reads an input bundle from disk and builds the measurement.
    pub fn open(path: &Path, method: Method) -> Result<Self, MjfitError> {
        let input = InputFile::open(path)?;
        Self::from_input(&input, method).map_err(|err| match err {
            MjfitError::Input(info) => {
                MjfitError::Input(info.with_context("path", path.display()))
            }
            other => other,
        })
    }
}
