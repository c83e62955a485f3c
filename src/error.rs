// THEORY:
// The error taxonomy follows one rule: a single degenerate frame must never
// halt a continuous detection stream. Per-tick failures (`InvalidFrame`,
// `StateMismatch`) are diagnostics the caller can log and ignore, because the
// pipeline has already recovered internally by the time they are returned.
// Only `Configuration` is fatal, and it can only occur at construction time.

use thiserror::Error;

/// All failure modes of the detection pipeline.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The incoming frame is malformed (zero area, buffer length not matching
    /// the declared dimensions, or a channel count differing from earlier
    /// frames). The tick was skipped; pipeline state is undisturbed.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The frame dimensions disagree with the persisted background state.
    /// All transient state has already been reset; the next well-formed frame
    /// reseeds the pipeline.
    #[error("frame is {actual_width}x{actual_height} but detector state is {expected_width}x{expected_height}; state was reset")]
    StateMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// A configuration value is out of range. Raised only while constructing
    /// a pipeline, never mid-run.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
