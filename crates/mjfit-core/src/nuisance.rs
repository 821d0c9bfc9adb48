//! Nuisance parameters and the analysis methods they are attached to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, MjfitError};

/// Definition of the balance observable used by a multijet measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    /// Transverse momentum balance between the leading jet and the recoil.
    #[serde(rename = "PtBal", alias = "pt-bal", alias = "pt_bal")]
    PtBal,
    /// Missing transverse momentum projection fraction.
    #[serde(rename = "MPF", alias = "mpf")]
    Mpf,
}

impl Method {
    /// Label used to name stored inputs for this method.
    pub fn label(&self) -> &'static str {
        match self {
            Method::PtBal => "PtBal",
            Method::Mpf => "MPF",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Method {
    type Err = MjfitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ptbal" | "pt-bal" | "pt_bal" => Ok(Method::PtBal),
            "mpf" => Ok(Method::Mpf),
            _ => Err(MjfitError::Config(
                ErrorInfo::new("unknown-method", "unrecognised analysis method")
                    .with_context("method", s)
                    .with_hint("expected one of: pt-bal, mpf"),
            )),
        }
    }
}

/// Shape of a nuisance shift as a function of pt.
///
/// Evaluates to `scale * ln(pt)^log_power * pt^pt_power`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeFunction {
    /// Overall normalisation.
    pub scale: f64,
    /// Power of `ln(pt)`.
    #[serde(default)]
    pub log_power: i32,
    /// Power of `pt`.
    #[serde(default)]
    pub pt_power: i32,
}

impl ShapeFunction {
    /// Shape independent of pt.
    pub const fn constant(scale: f64) -> Self {
        Self {
            scale,
            log_power: 0,
            pt_power: 0,
        }
    }

    /// Shape `scale * ln(pt)^log_power * pt^pt_power`.
    pub const fn new(scale: f64, log_power: i32, pt_power: i32) -> Self {
        Self {
            scale,
            log_power,
            pt_power,
        }
    }

    /// Evaluates the shape at the given pt.
    pub fn eval(&self, pt: f64) -> f64 {
        let mut value = self.scale;
        if self.log_power != 0 {
            value *= pt.ln().powi(self.log_power);
        }
        if self.pt_power != 0 {
            value *= pt.powi(self.pt_power);
        }
        value
    }
}

/// Single named nuisance parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuisanceEntry {
    /// Unique name of the parameter.
    pub name: String,
    /// Current value of the parameter.
    #[serde(default)]
    pub value: f64,
    /// Shape of the additive shift it controls.
    pub shape: ShapeFunction,
}

impl NuisanceEntry {
    /// Creates an entry with the nominal value of zero.
    pub fn new(name: impl Into<String>, shape: ShapeFunction) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
            shape,
        }
    }

    /// Additive shift at the given pt.
    pub fn shift(&self, pt: f64) -> f64 {
        self.value * self.shape.eval(pt)
    }
}

/// Nuisance parameters grouped by the analysis method they apply to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NuisanceSet {
    /// Parameters shifting the pt balance observable.
    #[serde(default, rename = "PtBal", alias = "pt_bal")]
    pub pt_bal: Vec<NuisanceEntry>,
    /// Parameters shifting the MPF observable.
    #[serde(default, rename = "MPF", alias = "mpf")]
    pub mpf: Vec<NuisanceEntry>,
}

impl NuisanceSet {
    /// Set without any nuisance parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Nominal multijet nuisances: JER, JEC, FSR and PU variations for both methods, all at
    /// zero.
    pub fn multijet_nominal() -> Self {
        let pt_bal = ["JER", "JEC", "FSR", "PU"]
            .iter()
            .map(|source| {
                NuisanceEntry::new(format!("MJB_{source}"), ShapeFunction::constant(0.01))
            })
            .collect();
        let mpf = vec![
            NuisanceEntry::new("MPF_JER", ShapeFunction::new(0.01, 1, 0)),
            NuisanceEntry::new("MPF_JEC", ShapeFunction::constant(0.01)),
            NuisanceEntry::new("MPF_FSR", ShapeFunction::new(0.01, 2, 0)),
            NuisanceEntry::new("MPF_PU", ShapeFunction::new(0.01, 1, 1)),
        ];
        Self { pt_bal, mpf }
    }

    /// Parses a set from YAML (JSON is accepted as well).
    pub fn from_yaml_str(text: &str) -> Result<Self, MjfitError> {
        let set: Self = serde_yaml::from_str(text).map_err(|err| {
            MjfitError::Serde(ErrorInfo::new("nuisance-yaml-read", err.to_string()))
        })?;
        set.validate()?;
        Ok(set)
    }

    /// Serialises the set to YAML.
    pub fn to_yaml_string(&self) -> Result<String, MjfitError> {
        serde_yaml::to_string(self).map_err(|err| {
            MjfitError::Serde(ErrorInfo::new("nuisance-yaml-write", err.to_string()))
        })
    }

    /// Checks that names are unique across the whole set.
    pub fn validate(&self) -> Result<(), MjfitError> {
        let mut seen = std::collections::BTreeSet::new();
        for entry in self.iter() {
            if !seen.insert(entry.name.as_str()) {
                return Err(MjfitError::Config(
                    ErrorInfo::new("duplicate-nuisance", "nuisance names must be unique")
                        .with_context("name", &entry.name),
                ));
            }
        }
        Ok(())
    }

    /// Parameters relevant to the given method.
    pub fn entries(&self, method: Method) -> &[NuisanceEntry] {
        match method {
            Method::PtBal => &self.pt_bal,
            Method::Mpf => &self.mpf,
        }
    }

    /// Iterates over all parameters, pt balance ones first.
    pub fn iter(&self) -> impl Iterator<Item = &NuisanceEntry> {
        self.pt_bal.iter().chain(self.mpf.iter())
    }

    /// Total number of parameters.
    pub fn len(&self) -> usize {
        self.pt_bal.len() + self.mpf.len()
    }

    /// Whether the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current value of the named parameter.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    /// Updates the value of the named parameter.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), MjfitError> {
        let entry = self
            .pt_bal
            .iter_mut()
            .chain(self.mpf.iter_mut())
            .find(|entry| entry.name == name)
            .ok_or_else(|| {
                MjfitError::Config(
                    ErrorInfo::new("unknown-nuisance", "no nuisance parameter with this name")
                        .with_context("name", name),
                )
            })?;
        entry.value = value;
        Ok(())
    }

    /// Sum of the shifts of all parameters of the given method at the given pt.
    pub fn shift(&self, method: Method, pt: f64) -> f64 {
        self.entries(method)
            .iter()
            .map(|entry| entry.shift(pt))
            .sum()
    }
}
