use thiserror::Error;

/// Process-level error carrying the exit code reported by the `cagecv` binary.
///
/// Exit codes:
/// - `2`: invalid input or configuration
/// - `3`: not enough data left to run anything
/// - `4`: internal / I/O failure
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of the cross-validation core.
///
/// Only `Cancelled` and the data/config variants end a configuration; model
/// failures are per fold and the sweep keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CvError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Group '{group}' appears in both train and test of fold {fold}")]
    GroupLeakage { fold: usize, group: String },
    #[error("Model fit failed on fold {fold} (test groups: {}): {message}", .groups.join(","))]
    ModelFit {
        fold: usize,
        groups: Vec<String>,
        message: String,
    },
    #[error("Model predict failed on fold {fold} (test groups: {}): {message}", .groups.join(","))]
    ModelPredict {
        fold: usize,
        groups: Vec<String>,
        message: String,
    },
    #[error("Correlation is undefined: {0}")]
    DegenerateCorrelation(String),
    #[error("No fold produced predictions")]
    EmptyAggregation,
    #[error("Length mismatch: {left} true values vs {right} predictions")]
    LengthMismatch { left: usize, right: usize },
    #[error("Cancelled")]
    Cancelled,
}

impl CvError {
    /// Whether the error only invalidates a single fold.
    pub fn is_fold_local(&self) -> bool {
        matches!(self, CvError::ModelFit { .. } | CvError::ModelPredict { .. })
    }
}

impl From<CvError> for AppError {
    fn from(err: CvError) -> Self {
        let code = match err {
            CvError::InsufficientData(_) | CvError::EmptyAggregation => 3,
            CvError::InvalidConfig(_) | CvError::LengthMismatch { .. } => 2,
            _ => 4,
        };
        AppError::new(code, err.to_string())
    }
}

/// Failures reported by a [`crate::models::SurvivalModel`] implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model used before fit")]
    NotFitted,
    #[error("no usable training rows")]
    NoTrainingRows,
    #[error("expected {expected} feature columns, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("numerical failure: {0}")]
    Numerical(String),
    #[error("{0}")]
    Other(String),
}
