//! Discretized coordinate systems of 3D datasets
//!
//! A [`GridDescriptor`] places a dataset on an infinite regular lattice: the
//! world position of its reference point (`origin`), the per-axis spacing
//! (`delta`) and the integer index of the reference point within the lattice
//! (`iorigin`). Two descriptors are *consistent* when they sit on the same
//! lattice family, i.e. equal spacing and the same fractional offset of their
//! origins within a cell. Consistent descriptors can be combined into one that
//! covers both.

use crate::attributes::{self, AttributeSource};
use crate::errors::{GridFoldError, Result};

/// Summed fractional-offset difference below which two origins are aligned
pub const ALIGNMENT_TOLERANCE: f64 = 1e-5;

/// Default attribute names holding the grid metadata of a dataset
pub const ORIGIN_ATTRIBUTE: &str = "origin";
pub const DELTA_ATTRIBUTE: &str = "delta";
pub const IORIGIN_ATTRIBUTE: &str = "iorigin";

/// One dataset's position on a regular 3D lattice
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescriptor {
    origin: [f64; 3],
    delta: [f64; 3],
    iorigin: [i32; 3],
    label: Vec<String>,
}

/// Position of `x` within a cell of size `d`, in units of `d`
///
/// Uses the truncating floating remainder, so negative `x` gives a negative
/// fraction. `d == 0` yields NaN.
fn fractional_offset(x: f64, d: f64) -> f64 {
    (x % d) / d
}

impl GridDescriptor {
    /// Unlabelled descriptor; no validation is performed
    #[must_use]
    pub fn new(origin: [f64; 3], delta: [f64; 3], iorigin: [i32; 3]) -> Self {
        Self {
            origin,
            delta,
            iorigin,
            label: Vec::new(),
        }
    }

    /// Descriptor with a label, tokenized on whitespace
    #[must_use]
    pub fn with_label(origin: [f64; 3], delta: [f64; 3], iorigin: [i32; 3], label: &str) -> Self {
        Self {
            label: label.split_whitespace().map(str::to_string).collect(),
            ..Self::new(origin, delta, iorigin)
        }
    }

    /// Read `origin`, `delta` and `iorigin` attributes from `source`
    ///
    /// # Errors
    ///
    /// Any attribute that is missing or not exactly three elements long.
    pub fn from_attributes<S: AttributeSource + ?Sized>(source: &S, label: Option<&str>) -> Result<Self> {
        Self::from_named_attributes(
            source,
            [ORIGIN_ATTRIBUTE, DELTA_ATTRIBUTE, IORIGIN_ATTRIBUTE],
            label,
        )
    }

    /// Same as [`from_attributes`](Self::from_attributes) with custom attribute
    /// names, given as `[origin, delta, iorigin]`
    ///
    /// # Errors
    ///
    /// Any attribute that is missing or not exactly three elements long.
    pub fn from_named_attributes<S: AttributeSource + ?Sized>(
        source: &S,
        names: [&str; 3],
        label: Option<&str>,
    ) -> Result<Self> {
        let origin: [f64; 3] = attributes::get(source, names[0])?;
        let delta: [f64; 3] = attributes::get(source, names[1])?;
        let iorigin: [i32; 3] = attributes::get(source, names[2])?;

        Ok(match label {
            Some(label) => Self::with_label(origin, delta, iorigin, label),
            None => Self::new(origin, delta, iorigin),
        })
    }

    /// Cell size per axis
    #[must_use]
    pub const fn scale(&self) -> [f64; 3] {
        self.delta
    }

    /// World-space reference point
    #[must_use]
    pub const fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Lattice index of the reference point
    #[must_use]
    pub const fn iorigin(&self) -> [i32; 3] {
        self.iorigin
    }

    /// Label tokens
    #[must_use]
    pub fn label(&self) -> &[String] {
        &self.label
    }

    /// Label tokens joined by single spaces
    #[must_use]
    pub fn name(&self) -> String {
        self.label.join(" ")
    }

    /// First axis with zero spacing, if any
    #[must_use]
    pub fn degenerate_axis(&self) -> Option<usize> {
        self.delta.iter().position(|&d| d == 0.0)
    }

    /// World position of lattice index `ijk`
    #[must_use]
    pub fn index_to_world(&self, ijk: [i32; 3]) -> [f64; 3] {
        std::array::from_fn(|a| {
            self.origin[a] + (f64::from(ijk[a]) - f64::from(self.iorigin[a])) * self.delta[a]
        })
    }

    /// World position of lattice index 0 on axis `a`, up to sign
    fn lattice_start(&self, a: usize) -> f64 {
        (self.origin[a] - f64::from(self.iorigin[a]) * self.delta[a]).abs()
    }

    /// Whether both grids are sub-lattices of the same infinite lattice
    ///
    /// Spacing must match exactly; origins may differ by whole cells. Not
    /// transitive near the tolerance.
    #[must_use]
    pub fn is_consistent_with(&self, other: &GridDescriptor) -> bool {
        let diff: f64 = (0..3)
            .map(|a| {
                let mine = fractional_offset(self.origin[a], self.delta[a]);
                let theirs = fractional_offset(other.origin[a], other.delta[a]);
                (mine - theirs).abs()
            })
            .sum();

        self.delta == other.delta && diff < ALIGNMENT_TOLERANCE
    }

    /// Merge two consistent descriptors into one covering both
    ///
    /// The result keeps the shared spacing and takes the component-wise minimum
    /// of `origin` and `iorigin`. Label tokens are kept where both agree and
    /// blanked where they differ; tokens past the shorter label are dropped.
    ///
    /// # Errors
    ///
    /// - [`GridFoldError::PreconditionViolation`] if the descriptors are not
    ///   [consistent](Self::is_consistent_with)
    /// - [`GridFoldError::IncompatibleOrigin`] if they disagree on the world
    ///   position of lattice index 0 on any axis
    pub fn combine(&self, other: &GridDescriptor) -> Result<GridDescriptor> {
        if !self.is_consistent_with(other) {
            return Err(GridFoldError::PreconditionViolation(format!(
                "cannot combine inconsistent grids '{}' and '{}'",
                self.name(),
                other.name()
            )));
        }

        for a in 0..3 {
            let existing = self.lattice_start(a);
            let incoming = other.lattice_start(a);
            if existing != incoming {
                return Err(GridFoldError::IncompatibleOrigin {
                    axis: a,
                    existing,
                    incoming,
                });
            }
        }

        let label = self
            .label
            .iter()
            .zip(&other.label)
            .map(|(mine, theirs)| {
                if mine == theirs {
                    mine.clone()
                } else {
                    String::new()
                }
            })
            .collect();

        Ok(GridDescriptor {
            origin: std::array::from_fn(|a| self.origin[a].min(other.origin[a])),
            delta: self.delta,
            iorigin: std::array::from_fn(|a| self.iorigin[a].min(other.iorigin[a])),
            label,
        })
    }
}

impl std::fmt::Display for GridDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let [ox, oy, oz] = self.origin;
        let [dx, dy, dz] = self.delta;
        let [ix, iy, iz] = self.iorigin;
        writeln!(f, "{}:", self.name())?;
        writeln!(f, "  origin = {ox} {oy} {oz}")?;
        writeln!(f, "  delta = {dx} {dy} {dz}")?;
        writeln!(f, "  iorigin = {ix} {iy} {iz}")
    }
}
