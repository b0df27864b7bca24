use crate::Chemistry::reaction::ReactionError;
use crate::Chemistry::species::{SpeciesError, SpeciesId};
use crate::linear_solver::SolverError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcessError {
    #[error("reaction species {missing:?} are present in neither the inlet nor the outlet stream")]
    StreamCannotCoverReaction { missing: Vec<SpeciesId> },
    #[error("both streams are fully known, nothing to solve for")]
    OverdeterminedStreams,
    #[error("not enough known flows to solve the mass balance")]
    UnderdeterminedStreams,
    #[error("species {species:?} is already in the stream")]
    DuplicateSpeciesInStream { species: SpeciesId },
    #[error("species {species:?} is not in the stream")]
    SpeciesNotInStream { species: SpeciesId },
    #[error("expected {expected} reaction extents, found {found}")]
    ExtentCountMismatch { expected: usize, found: usize },
    #[error("no {kind} with index {index}")]
    InvalidHandle { kind: &'static str, index: usize },
    #[error("invalid flowsheet topology: {reason}")]
    InvalidTopology { reason: String },
    #[error("solving units of kind `{unit}` is not supported")]
    UnsupportedUnit { unit: String },
    #[error(transparent)]
    Reaction(#[from] ReactionError),
    #[error(transparent)]
    Species(#[from] SpeciesError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}
