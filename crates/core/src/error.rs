//! Compander error types

use thiserror::Error;

/// Errors that can occur while configuring or running the compander
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompandError {
    /// A transfer point could not be parsed as `in/out`
    #[error("Invalid and/or missing input/output value in point {index}: '{value}'")]
    InvalidPoint { index: usize, value: String },

    /// Transfer points must be given in increasing input order
    #[error("Transfer function input values must be increasing (point {index}: {input} dB after {previous} dB)")]
    NonIncreasingPoints { index: usize, previous: f64, input: f64 },

    /// An attack or decay entry was not a number
    #[error("Invalid {kind} value: '{value}'")]
    InvalidTime { kind: &'static str, value: String },

    /// Attack and decay times cannot be negative
    #[error("Negative {kind} value: {value}")]
    NegativeTime { kind: &'static str, value: f64 },

    /// More attacks or decays than channels
    #[error("Number of attacks/decays ({count}) bigger than number of channels ({channels})")]
    TooManyTimes { count: usize, channels: usize },

    /// Attacks and decays must come in pairs
    #[error("Number of attacks {attacks} differs from number of decays {decays}")]
    AttackDecayMismatch { attacks: usize, decays: usize },

    /// Channel count must be positive
    #[error("Invalid number of channels: {0}")]
    InvalidChannels(usize),

    /// Sample rate must be positive
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// A scalar option is outside its allowed range
    #[error("Option '{option}' out of range: {value} (allowed {min} to {max})")]
    OutOfRange {
        option: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Settings file could not be decoded
    #[error("Failed to parse settings: {0}")]
    Settings(String),

    /// Allocation of filter state or an output block failed
    #[error("Out of memory while allocating {0}")]
    ResourceExhausted(&'static str),

    /// Audio was submitted before the filter was configured
    #[error("Compander is not configured")]
    NotConfigured,

    /// Block layout does not match the configured layout
    #[error("Channel mismatch: configured for {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    /// Planes of a planar block differ in length
    #[error("Planar block planes have unequal lengths")]
    RaggedBlock,
}

impl CompandError {
    /// Whether this error was raised while validating configuration
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            CompandError::ResourceExhausted(_)
                | CompandError::NotConfigured
                | CompandError::ChannelMismatch { .. }
                | CompandError::RaggedBlock
        )
    }
}

/// Result type for compander operations
pub type CompandResult<T> = Result<T, CompandError>;
