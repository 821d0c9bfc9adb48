use mjfit_core::errors::{ErrorInfo, MjfitError};
use serde::{Deserialize, Serialize};

const EDGE_REL_TOLERANCE: f64 = 1e-9;

fn binning_error(code: &str, message: impl Into<String>) -> MjfitError {
    MjfitError::Binning(ErrorInfo::new(code, message.into()))
}

fn input_error(code: &str, message: impl Into<String>) -> MjfitError {
    MjfitError::Input(ErrorInfo::new(code, message.into()))
}

/// Checks that edges describe at least one bin and are finite and strictly increasing.
pub fn validate_edges(edges: &[f64]) -> Result<(), MjfitError> {
    if edges.len() < 2 {
        return Err(MjfitError::Binning(
            ErrorInfo::new("too-few-edges", "a binning needs at least two edges")
                .with_context("edges", edges.len()),
        ));
    }
    if let Some(idx) = edges.iter().position(|edge| !edge.is_finite()) {
        return Err(MjfitError::Binning(
            ErrorInfo::new("non-finite-edge", "bin edges must be finite").with_context("index", idx),
        ));
    }
    if let Some(idx) = edges.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(MjfitError::Binning(
            ErrorInfo::new("non-monotonic-binning", "bin edges must be strictly increasing")
                .with_context("index", idx + 1)
                .with_context("lower", edges[idx])
                .with_context("upper", edges[idx + 1]),
        ));
    }
    Ok(())
}

pub(crate) fn edges_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= EDGE_REL_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Location of a value relative to an [`Axis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPosition {
    /// Below the first edge.
    Underflow,
    /// Inside the bin with the given zero-based index.
    Bin(usize),
    /// At or above the last edge.
    Overflow,
}

/// Variable-width binning. Bins include their lower edge and exclude their upper edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Axis {
    edges: Vec<f64>,
}

impl TryFrom<Vec<f64>> for Axis {
    type Error = MjfitError;

    fn try_from(edges: Vec<f64>) -> Result<Self, Self::Error> {
        Axis::new(edges)
    }
}

impl From<Axis> for Vec<f64> {
    fn from(axis: Axis) -> Self {
        axis.edges
    }
}

impl Axis {
    /// Creates an axis from validated edges.
    pub fn new(edges: Vec<f64>) -> Result<Self, MjfitError> {
        validate_edges(&edges)?;
        Ok(Self { edges })
    }

    /// Creates an axis of `n_bins` equal bins over `[low, high)`.
    pub fn uniform(n_bins: usize, low: f64, high: f64) -> Result<Self, MjfitError> {
        if n_bins == 0 {
            return Err(binning_error("too-few-edges", "an axis needs at least one bin"));
        }
        let width = (high - low) / n_bins as f64;
        let edges = (0..=n_bins).map(|idx| low + width * idx as f64).collect();
        Self::new(edges)
    }

    /// Bin edges, `n_bins() + 1` values.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the bin.
    pub fn low_edge(&self, bin: usize) -> f64 {
        self.edges[bin]
    }

    /// Upper edge of the bin.
    pub fn up_edge(&self, bin: usize) -> f64 {
        self.edges[bin + 1]
    }

    /// Width of the bin.
    pub fn width(&self, bin: usize) -> f64 {
        self.edges[bin + 1] - self.edges[bin]
    }

    /// Centre of the bin.
    pub fn center(&self, bin: usize) -> f64 {
        0.5 * (self.edges[bin] + self.edges[bin + 1])
    }

    /// Lowest edge of the axis.
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    /// Highest edge of the axis.
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Finds the bin containing `x`.
    pub fn find(&self, x: f64) -> AxisPosition {
        // Number of edges not above x.
        let k = self.edges.partition_point(|&edge| edge <= x);
        if k == 0 {
            AxisPosition::Underflow
        } else if k == self.edges.len() {
            AxisPosition::Overflow
        } else {
            AxisPosition::Bin(k - 1)
        }
    }

    /// Whether both axes have the same edges within floating-point tolerance.
    pub fn same_binning(&self, other: &Axis) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(other.edges.iter())
                .all(|(&a, &b)| edges_match(a, b))
    }
}

/// One-dimensional histogram without under/overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHist1D")]
pub struct Hist1D {
    axis: Axis,
    contents: Vec<f64>,
}

#[derive(Deserialize)]
struct RawHist1D {
    axis: Axis,
    contents: Vec<f64>,
}

impl TryFrom<RawHist1D> for Hist1D {
    type Error = MjfitError;

    fn try_from(raw: RawHist1D) -> Result<Self, Self::Error> {
        Hist1D::new(raw.axis, raw.contents)
    }
}

impl Hist1D {
    /// Creates a histogram; one content per bin is required.
    pub fn new(axis: Axis, contents: Vec<f64>) -> Result<Self, MjfitError> {
        if contents.len() != axis.n_bins() {
            return Err(MjfitError::Input(
                ErrorInfo::new("content-length", "histogram contents do not match its axis")
                    .with_context("bins", axis.n_bins())
                    .with_context("contents", contents.len()),
            ));
        }
        Ok(Self { axis, contents })
    }

    /// Binning of the histogram.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Content of the bin.
    pub fn content(&self, bin: usize) -> f64 {
        self.contents[bin]
    }

    /// All bin contents.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }
}

/// Two-dimensional histogram, contents stored x-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHist2D")]
pub struct Hist2D {
    x_axis: Axis,
    y_axis: Axis,
    contents: Vec<f64>,
}

#[derive(Deserialize)]
struct RawHist2D {
    x_axis: Axis,
    y_axis: Axis,
    contents: Vec<f64>,
}

impl TryFrom<RawHist2D> for Hist2D {
    type Error = MjfitError;

    fn try_from(raw: RawHist2D) -> Result<Self, Self::Error> {
        Hist2D::new(raw.x_axis, raw.y_axis, raw.contents)
    }
}

impl Hist2D {
    /// Creates a histogram from x-major contents.
    pub fn new(x_axis: Axis, y_axis: Axis, contents: Vec<f64>) -> Result<Self, MjfitError> {
        let expected = x_axis.n_bins() * y_axis.n_bins();
        if contents.len() != expected {
            return Err(MjfitError::Input(
                ErrorInfo::new("content-length", "2D histogram contents do not match its axes")
                    .with_context("bins", expected)
                    .with_context("contents", contents.len()),
            ));
        }
        Ok(Self {
            x_axis,
            y_axis,
            contents,
        })
    }

    /// Creates a histogram from one row of y contents per x bin.
    pub fn from_rows(x_axis: Axis, y_axis: Axis, rows: Vec<Vec<f64>>) -> Result<Self, MjfitError> {
        if rows.len() != x_axis.n_bins() {
            return Err(input_error(
                "content-length",
                "2D histogram needs one row per x bin",
            ));
        }
        let contents = rows.into_iter().flatten().collect();
        Self::new(x_axis, y_axis, contents)
    }

    /// Binning along x.
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Binning along y.
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Content of the bin `(x, y)`.
    pub fn content(&self, x: usize, y: usize) -> f64 {
        self.contents[x * self.y_axis.n_bins() + y]
    }

    /// Contents of all y bins for one x bin.
    pub fn row(&self, x: usize) -> &[f64] {
        let ny = self.y_axis.n_bins();
        &self.contents[x * ny..(x + 1) * ny]
    }
}

/// Content of a profile bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileBin {
    /// Mean of the profiled quantity.
    pub mean: f64,
    /// Number of entries (sum of weights).
    #[serde(default)]
    pub entries: f64,
    /// Uncertainty on the mean.
    pub error: f64,
}

impl ProfileBin {
    /// Bin with no entries.
    pub const EMPTY: ProfileBin = ProfileBin {
        mean: 0.0,
        entries: 0.0,
        error: 0.0,
    };
}

/// Profile histogram: mean and its uncertainty per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct Profile {
    axis: Axis,
    bins: Vec<ProfileBin>,
}

#[derive(Deserialize)]
struct RawProfile {
    axis: Axis,
    bins: Vec<ProfileBin>,
}

impl TryFrom<RawProfile> for Profile {
    type Error = MjfitError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        Profile::new(raw.axis, raw.bins)
    }
}

impl Profile {
    /// Creates a profile; one entry per bin is required.
    pub fn new(axis: Axis, bins: Vec<ProfileBin>) -> Result<Self, MjfitError> {
        if bins.len() != axis.n_bins() {
            return Err(MjfitError::Input(
                ErrorInfo::new("content-length", "profile bins do not match its axis")
                    .with_context("bins", axis.n_bins())
                    .with_context("contents", bins.len()),
            ));
        }
        Ok(Self { axis, bins })
    }

    /// Binning of the profile.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Content of the bin.
    pub fn bin(&self, bin: usize) -> &ProfileBin {
        &self.bins[bin]
    }

    /// Mean in the bin.
    pub fn mean(&self, bin: usize) -> f64 {
        self.bins[bin].mean
    }

    /// Uncertainty on the mean in the bin.
    pub fn error(&self, bin: usize) -> f64 {
        self.bins[bin].error
    }

    /// All bins.
    pub fn bins(&self) -> &[ProfileBin] {
        &self.bins
    }

    /// Merges bins onto a coarser axis whose edges coincide with edges of this profile.
    ///
    /// Target edges outside the range of this profile are allowed; source bins outside the
    /// target range are dropped. The merged error is the error on the mean of the pooled
    /// sample, with the spread inside each source bin taken as `error^2 * entries`.
    pub fn rebin_aligned(&self, target: &Axis) -> Result<Profile, MjfitError> {
        let source = self.axis.edges();
        for (idx, &edge) in target.edges().iter().enumerate() {
            let inside = edge > self.axis.min() && edge < self.axis.max();
            if inside && !source.iter().any(|&s| edges_match(s, edge)) {
                return Err(MjfitError::Input(
                    ErrorInfo::new(
                        "unaligned-binning",
                        "target edge does not coincide with a source edge",
                    )
                    .with_context("index", idx)
                    .with_context("edge", edge),
                ));
            }
        }

        let mut sum_w = vec![0.0; target.n_bins()];
        let mut sum_wy = vec![0.0; target.n_bins()];
        let mut sum_wy2 = vec![0.0; target.n_bins()];
        for (idx, bin) in self.bins.iter().enumerate() {
            if bin.entries <= 0.0 {
                continue;
            }
            // Source bins are aligned, so their centre decides the target bin.
            let AxisPosition::Bin(dest) = target.find(self.axis.center(idx)) else {
                continue;
            };
            let spread2 = bin.error * bin.error * bin.entries;
            sum_w[dest] += bin.entries;
            sum_wy[dest] += bin.entries * bin.mean;
            sum_wy2[dest] += bin.entries * (spread2 + bin.mean * bin.mean);
        }

        let bins = (0..target.n_bins())
            .map(|dest| {
                let w = sum_w[dest];
                if w <= 0.0 {
                    return ProfileBin::EMPTY;
                }
                let mean = sum_wy[dest] / w;
                let variance = (sum_wy2[dest] / w - mean * mean).max(0.0);
                ProfileBin {
                    mean,
                    entries: w,
                    error: (variance / w).sqrt(),
                }
            })
            .collect();
        Profile::new(target.clone(), bins)
    }
}
