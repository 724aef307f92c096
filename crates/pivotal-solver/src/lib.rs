mod error;
mod problem;
mod simplex;
mod solution;
mod standard_form;
mod tableau;

pub use error::{Location, ModelError, SolveError};
pub use problem::{Constraint, ConstraintOp, Model, Term};
pub use simplex::Solver;
pub use solution::{ConstraintViolation, Solution};
pub use standard_form::StandardForm;
pub use tableau::Tableau;
