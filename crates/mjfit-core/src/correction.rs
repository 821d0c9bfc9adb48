//! Jet correction capability and the concrete corrections shipped with mjfit.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, MjfitError};

/// Invertible pt-dependent multiplicative correction.
///
/// `eval` returns the factor applied to an uncorrected pt, and `undo_corr` maps a corrected
/// pt back to the uncorrected one, so that `undo_corr(pt * eval(pt)) == pt`. Implementations
/// must be monotonic over the pt range of the measurement; this is not validated. An
/// implementation that cannot invert a value returns NaN.
pub trait JetCorrection {
    /// Correction factor for the given uncorrected pt.
    fn eval(&self, pt: f64) -> f64;

    /// Uncorrected pt corresponding to the given corrected pt.
    fn undo_corr(&self, pt: f64) -> f64;
}

impl<T: JetCorrection + ?Sized> JetCorrection for &T {
    fn eval(&self, pt: f64) -> f64 {
        (**self).eval(pt)
    }

    fn undo_corr(&self, pt: f64) -> f64 {
        (**self).undo_corr(pt)
    }
}

impl<T: JetCorrection + ?Sized> JetCorrection for Box<T> {
    fn eval(&self, pt: f64) -> f64 {
        (**self).eval(pt)
    }

    fn undo_corr(&self, pt: f64) -> f64 {
        (**self).undo_corr(pt)
    }
}

/// Correction that leaves every jet untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdentityCorrection;

impl JetCorrection for IdentityCorrection {
    fn eval(&self, _pt: f64) -> f64 {
        1.0
    }

    fn undo_corr(&self, pt: f64) -> f64 {
        pt
    }
}

/// Constant multiplicative correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleCorrection {
    factor: f64,
}

impl ScaleCorrection {
    /// Creates a constant correction; the factor must be finite and positive.
    pub fn new(factor: f64) -> Result<Self, MjfitError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(MjfitError::Config(
                ErrorInfo::new("invalid-correction", "scale factor must be finite and positive")
                    .with_context("factor", factor),
            ));
        }
        Ok(Self { factor })
    }

    /// Returns the constant factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl JetCorrection for ScaleCorrection {
    fn eval(&self, _pt: f64) -> f64 {
        self.factor
    }

    fn undo_corr(&self, pt: f64) -> f64 {
        pt / self.factor
    }
}

const INVERSION_MAX_ITERS: usize = 200;
const INVERSION_REL_TOLERANCE: f64 = 1e-12;
const BRACKET_EXPANSIONS: usize = 16;

/// Correction given by a polynomial in `ln(pt / pt_ref)`.
///
/// The inverse is found numerically by bisection on `pt * eval(pt)`, which must be
/// increasing in pt.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPolyCorrection {
    coefficients: Vec<f64>,
    pt_ref: f64,
}

impl LogPolyCorrection {
    /// Creates the correction from its coefficients, constant term first.
    pub fn new(coefficients: Vec<f64>, pt_ref: f64) -> Result<Self, MjfitError> {
        if coefficients.is_empty() {
            return Err(MjfitError::Config(ErrorInfo::new(
                "invalid-correction",
                "log-polynomial correction needs at least one coefficient",
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(MjfitError::Config(ErrorInfo::new(
                "invalid-correction",
                "log-polynomial coefficients must be finite",
            )));
        }
        if !(pt_ref.is_finite() && pt_ref > 0.0) {
            return Err(MjfitError::Config(
                ErrorInfo::new("invalid-correction", "reference pt must be finite and positive")
                    .with_context("pt_ref", pt_ref),
            ));
        }
        Ok(Self {
            coefficients,
            pt_ref,
        })
    }

    /// Returns the polynomial coefficients.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn corrected_pt(&self, pt: f64) -> f64 {
        pt * self.eval(pt)
    }
}

impl JetCorrection for LogPolyCorrection {
    fn eval(&self, pt: f64) -> f64 {
        let x = (pt / self.pt_ref).ln();
        // Horner
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &coeff| acc * x + coeff)
    }

    fn undo_corr(&self, pt: f64) -> f64 {
        if !(pt.is_finite() && pt > 0.0) {
            return f64::NAN;
        }
        let mut lo = pt / 2.0;
        let mut hi = pt * 2.0;
        let mut bracketed = false;
        for _ in 0..BRACKET_EXPANSIONS {
            let f_lo = self.corrected_pt(lo) - pt;
            let f_hi = self.corrected_pt(hi) - pt;
            if f_lo <= 0.0 && f_hi >= 0.0 {
                bracketed = true;
                break;
            }
            if f_lo > 0.0 {
                lo /= 2.0;
            }
            if f_hi < 0.0 {
                hi *= 2.0;
            }
        }
        if !bracketed {
            return f64::NAN;
        }
        for _ in 0..INVERSION_MAX_ITERS {
            let mid = 0.5 * (lo + hi);
            if self.corrected_pt(mid) < pt {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo <= INVERSION_REL_TOLERANCE * mid {
                break;
            }
        }
        0.5 * (lo + hi)
    }
}

fn default_pt_ref() -> f64 {
    100.0
}

/// Serializable description of a correction, used by configuration files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectionSpec {
    /// No correction.
    #[default]
    Identity,
    /// Constant multiplicative factor.
    Scale {
        /// Factor applied to every jet.
        factor: f64,
    },
    /// Polynomial in `ln(pt / pt_ref)`.
    LogPoly {
        /// Coefficients, constant term first.
        coefficients: Vec<f64>,
        /// Reference pt of the logarithm.
        #[serde(default = "default_pt_ref")]
        pt_ref: f64,
    },
}

impl CorrectionSpec {
    /// Builds the described correction.
    pub fn build(&self) -> Result<Box<dyn JetCorrection>, MjfitError> {
        Ok(match self {
            CorrectionSpec::Identity => Box::new(IdentityCorrection),
            CorrectionSpec::Scale { factor } => Box::new(ScaleCorrection::new(*factor)?),
            CorrectionSpec::LogPoly {
                coefficients,
                pt_ref,
            } => Box::new(LogPolyCorrection::new(coefficients.clone(), *pt_ref)?),
        })
    }
}
