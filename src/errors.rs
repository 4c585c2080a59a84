//! Centralized error handling for gridfold
//!
//! Every failure carries the attribute or dataset it concerns so the driver can
//! report an actionable message without extra bookkeeping.

/// Main error type for gridfold operations
#[derive(thiserror::Error, Debug)]
pub enum GridFoldError {
    /// NetCDF/HDF5 container errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Dataset name pattern failed to compile
    #[error("Invalid dataset pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A required metadata attribute is missing
    #[error("Attribute '{attribute}' not found on '{location}'")]
    AttributeNotFound { attribute: String, location: String },

    /// Byte size, declared extent and expected length of an attribute disagree
    #[error(
        "Error fetching attribute '{attribute}' on '{location}' - size based on requested datatype is {count}, but recorded size is {recorded}{}",
        expected_suffix(.expected)
    )]
    SizeMismatch {
        attribute: String,
        location: String,
        count: usize,
        recorded: usize,
        expected: Option<usize>,
    },

    /// Attribute holds values that cannot be read as numbers
    #[error("Attribute '{attribute}' on '{location}' has non-numeric type {kind}")]
    UnsupportedAttributeType {
        attribute: String,
        location: String,
        kind: String,
    },

    /// Two lattice-consistent grids disagree on where index 0 sits
    #[error("starts of coordinate systems don't match on axis {axis} ({existing} vs {incoming})")]
    IncompatibleOrigin {
        axis: usize,
        existing: f64,
        incoming: f64,
    },

    /// `combine` called on grids that are not consistent
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Grid spacing is zero on some axis
    #[error("Dataset '{dataset}' has zero grid spacing on axis {axis}")]
    DegenerateDelta { dataset: String, axis: usize },

    /// Dataset path does not exist in the container
    #[error("Dataset '{dataset}' not found in container")]
    DatasetNotFound { dataset: String },

    /// Dataset cannot be converted (e.g. wrong rank)
    #[error("Dataset '{dataset}' cannot be converted: {reason}")]
    InvalidDataset { dataset: String, reason: String },

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// Anything else
    #[error("{0}")]
    Generic(String),
}

fn expected_suffix(expected: &Option<usize>) -> String {
    expected.map(|n| format!(" (expected {n})")).unwrap_or_default()
}

impl GridFoldError {
    /// Whether the error concerns a single dataset and may be skipped
    ///
    /// Batch-wide failures (origin mismatches, I/O) are never skippable.
    #[must_use]
    pub const fn is_dataset_local(&self) -> bool {
        matches!(
            self,
            Self::AttributeNotFound { .. }
                | Self::SizeMismatch { .. }
                | Self::UnsupportedAttributeType { .. }
                | Self::DegenerateDelta { .. }
                | Self::InvalidDataset { .. }
        )
    }
}

impl From<String> for GridFoldError {
    fn from(error: String) -> Self {
        GridFoldError::Generic(error)
    }
}

impl From<&str> for GridFoldError {
    fn from(error: &str) -> Self {
        GridFoldError::Generic(error.to_string())
    }
}

/// Result type alias for gridfold operations
pub type Result<T> = std::result::Result<T, GridFoldError>;
