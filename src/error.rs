use crate::grid::FieldId;
use crate::pass::PassKind;
use thiserror::Error;

/// Everything that can go wrong while setting up or driving the solver.
///
/// Startup failures (no device, missing capability, shader compile errors)
/// are fatal: the solver must not proceed to simulation. A `SelfFeedback`
/// draw is a programming error and is rejected before any write happens.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("no suitable graphics device available: {0}")]
    DeviceUnavailable(String),

    #[error("device is missing required capability: {0}")]
    MissingCapability(&'static str),

    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: &'static str, log: String },

    #[error("pass would read and write {0:?} in the same draw")]
    SelfFeedback(FieldId),

    #[error("{kind:?} pass expects {expected} input(s), got {got}")]
    InputArity {
        kind: PassKind,
        expected: usize,
        got: usize,
    },

    #[error("simulation fields are not allocated yet")]
    FieldsUninitialized,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
