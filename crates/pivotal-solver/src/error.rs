use std::fmt;

use thiserror::Error;

/// Where in a model a malformed term was found
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Objective,
    /// Zero-based position in the model's constraint list
    Constraint(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Objective => write!(f, "objective"),
            Location::Constraint(index) => write!(f, "constraint {}", index),
        }
    }
}

/// Structural problems with a model, detected before any pivoting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown variable '{variable}' in {location}")]
    UnknownVariable { variable: String, location: Location },
    #[error("Variable declared more than once: {0}")]
    DuplicateVariable(String),
    #[error("Variable names must not be empty")]
    EmptyVariableName,
    #[error("Non-finite coefficient {value} on '{variable}' in {location}")]
    NonFiniteCoefficient {
        variable: String,
        value: f64,
        location: Location,
    },
    #[error("Non-finite right-hand side {value} in constraint {constraint}")]
    NonFiniteRhs { constraint: usize, value: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
    #[error("Problem is unbounded: '{variable}' (column {column}) can increase without limit")]
    Unbounded { column: usize, variable: String },
    #[error("Iteration limit of {limit} pivots exceeded")]
    IterationLimitExceeded { limit: usize },
    /// A tableau that breaks the basis invariant. Indicates a solver bug, not bad input.
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Invalid solver config: {reason}")]
    InvalidConfig { reason: &'static str },
}
