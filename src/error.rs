//! Rich diagnostic error types for the angle-exhaust engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the angle-exhaust engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum DiscoveryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Probability(#[from] ProbabilityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Probability errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ProbabilityError {
    #[error("p must be strictly between 0 and 1, got {value}")]
    #[diagnostic(
        code(exhaust::probability::invalid_p),
        help(
            "The per-angle success probability is an open-interval value. \
             Use the ProbabilityEstimator, which always yields p in [0.001, 0.5]."
        )
    )]
    InvalidProbability { value: f64 },

    #[error("target confidence must be strictly between 0 and 1, got {value}")]
    #[diagnostic(
        code(exhaust::probability::invalid_confidence),
        help("A target of 1.0 would need infinitely many angles. Try 0.9 to 0.99.")
    )]
    InvalidConfidence { value: f64 },

    #[error("angle count must be at least 1, got {n}")]
    #[diagnostic(
        code(exhaust::probability::invalid_count),
        help("Breakthrough probability is only defined for one or more angles.")
    )]
    InvalidAngleCount { n: usize },

    #[error("p = {p} needs more angles than can be counted for target {target_confidence}")]
    #[diagnostic(
        code(exhaust::probability::count_overflow),
        help("The per-angle probability is too small to plan for. Raise p or lower the target.")
    )]
    AngleCountOverflow { p: f64, target_confidence: f64 },

    #[error("unknown {descriptor} value: \"{value}\"")]
    #[diagnostic(
        code(exhaust::probability::unknown_descriptor),
        help("Expected one of: {expected}. Use `parse_or_default` to fall back instead.")
    )]
    UnknownDescriptor {
        descriptor: &'static str,
        value: String,
        expected: String,
    },
}

// ---------------------------------------------------------------------------
// Knowledge graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KnowledgeError {
    #[error("result references angle {angle_id}, which is not registered")]
    #[diagnostic(
        code(exhaust::knowledge::unregistered_angle),
        help("Register the angle with `add_angle` before recording its result.")
    )]
    UnregisteredAngle { angle_id: String },

    #[error("angle {angle_id} is already registered")]
    #[diagnostic(
        code(exhaust::knowledge::duplicate_angle),
        help("Angle ids are unique for the lifetime of a graph. Generate a fresh angle.")
    )]
    DuplicateAngle { angle_id: String },

    #[error("knowledge graph serialization failed: {message}")]
    #[diagnostic(
        code(exhaust::knowledge::serde),
        help(
            "The serialized graph could not be produced or parsed. \
             Check that the input came from `KnowledgeGraph::to_json`."
        )
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("no checkpoint available to resume from")]
    #[diagnostic(
        code(exhaust::engine::no_checkpoint),
        help(
            "A checkpoint is created when a running engine observes a pause request. \
             Pass a checkpoint explicitly or pause a run first."
        )
    )]
    NoCheckpoint,

    #[error("angle executor failed: {message}")]
    #[diagnostic(
        code(exhaust::engine::executor),
        help("The injected executor reported an error. The angle is recorded as failed.")
    )]
    Executor { message: String },

    #[error("audit log could not be exported: {message}")]
    #[diagnostic(code(exhaust::engine::audit_export))]
    AuditExport { message: String },
}

impl EngineError {
    /// Convenience constructor for executor implementations.
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Checkpoint errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {path}")]
    #[diagnostic(
        code(exhaust::checkpoint::io),
        help("Check that the directory exists and is writable, and that the disk is not full.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint could not be parsed: {path}: {message}")]
    #[diagnostic(
        code(exhaust::checkpoint::parse),
        help("The file is not a checkpoint written by `Checkpoint::save`, or it was truncated.")
    )]
    Parse { path: String, message: String },

    #[error("checkpoint could not be encoded: {message}")]
    #[diagnostic(code(exhaust::checkpoint::encode))]
    Encode { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read engine config: {path}")]
    #[diagnostic(
        code(exhaust::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config: {path}: {message}")]
    #[diagnostic(
        code(exhaust::config::parse),
        help("Check the TOML syntax in the engine config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write engine config: {path}")]
    #[diagnostic(
        code(exhaust::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine config: {message}")]
    #[diagnostic(
        code(exhaust::config::invalid),
        help("max_iterations must be at least 1 and branch_scale must be finite.")
    )]
    Invalid { message: String },
}

/// Convenience alias for engine operations.
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;
