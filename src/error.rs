//! Error types for stepseq

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stepseq operations
pub type Result<T> = std::result::Result<T, StepseqError>;

/// Main error type for stepseq
#[derive(Error, Debug)]
pub enum StepseqError {
    /// Missing required construction parameters
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Sequence definition loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Construction-time validation errors.
///
/// These are the only errors that propagate to the caller synchronously;
/// anything that goes wrong while a step runs is folded into the step's
/// status instead.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("No command line specified")]
    MissingCommandLine,

    #[error("Command name cannot be empty")]
    MissingName,
}

/// Sequence definition parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read sequence file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    #[error("Sequence '{0}' defines no steps")]
    NoSteps(String),

    #[error("Step {0} has an empty command line")]
    EmptyCommandLine(usize),

    #[error("Failed to load environment file '{path}': {error}")]
    EnvFile { path: PathBuf, error: String },

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Recursive interpolation detected")]
    RecursiveInterpolation,
}

/// Specialized result type for construction parameter validation
pub type ParameterResult<T> = std::result::Result<T, ParameterError>;

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;
