use log::{debug, trace};

use crate::error::SolveError;
use crate::problem::Model;
use crate::solution::Solution;
use crate::standard_form::StandardForm;
use crate::tableau::Tableau;

/// Primal simplex solver working on a dense tableau
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solver {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-7,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// # Errors
    ///
    /// Returns an error if the tolerance is negative or non-finite, or the
    /// iteration cap is zero.
    pub fn validate(&self) -> Result<(), SolveError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SolveError::InvalidConfig {
                reason: "tolerance must be finite and non-negative",
            });
        }
        if self.max_iterations == 0 {
            return Err(SolveError::InvalidConfig {
                reason: "max_iterations must be at least 1",
            });
        }
        Ok(())
    }

    /// Maximize the model's objective.
    ///
    /// Each call builds a fresh tableau, so one model can be solved repeatedly.
    pub fn solve(&self, model: &Model) -> Result<Solution, SolveError> {
        self.solve_traced(model).map(|(solution, _)| solution)
    }

    /// Like [`Solver::solve`], also handing back the final tableau
    pub fn solve_traced(&self, model: &Model) -> Result<(Solution, Tableau), SolveError> {
        self.validate()?;

        let form = StandardForm::from_model(model)?;
        let mut tableau = Tableau::build(&form);
        trace!("initial tableau:\n{}", tableau);

        let iterations = self.optimize(&mut tableau)?;
        let solution = self.extract_solution(&tableau, form.structural, iterations)?;
        Ok((solution, tableau))
    }

    /// Pivot until the objective row has no negative entry.
    ///
    /// Returns the number of pivots performed.
    pub fn optimize(&self, tableau: &mut Tableau) -> Result<usize, SolveError> {
        for iteration in 0..self.max_iterations {
            let Some((pivot_row, pivot_col)) = self.next_pivot(tableau)? else {
                debug!("optimal after {} pivots, objective {}", iteration, tableau.rhs(0));
                return Ok(iteration);
            };

            debug!(
                "pivot {}: entering {} (column {}), leaving row {}, value {}",
                iteration + 1,
                tableau.variables[pivot_col],
                pivot_col,
                pivot_row,
                tableau.get(pivot_row, pivot_col)
            );
            self.pivot(tableau, pivot_row, pivot_col);
            trace!("tableau after pivot {}:\n{}", iteration + 1, tableau);
        }

        // The last permitted pivot may have reached the optimum or exposed an unbounded column
        match self.next_pivot(tableau)? {
            None => Ok(self.max_iterations),
            Some(_) => Err(SolveError::IterationLimitExceeded {
                limit: self.max_iterations,
            }),
        }
    }

    /// Entering and leaving pair for the next pivot, `None` once optimal
    fn next_pivot(&self, tableau: &Tableau) -> Result<Option<(usize, usize)>, SolveError> {
        let Some(pivot_col) = self.find_pivot_column(tableau) else {
            return Ok(None);
        };
        let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
            debug!("column {} has no positive entry, unbounded", pivot_col);
            return Err(SolveError::Unbounded {
                column: pivot_col,
                variable: tableau.variables[pivot_col].clone(),
            });
        };
        Ok(Some((pivot_row, pivot_col)))
    }

    /// Dantzig's rule: most negative objective entry, lowest column on ties
    pub(crate) fn find_pivot_column(&self, tableau: &Tableau) -> Option<usize> {
        let objective = &tableau.data[0][..tableau.num_variables()];

        let mut min_col: Option<usize> = None;
        for (j, &value) in objective.iter().enumerate() {
            if value < 0.0 && min_col.is_none_or(|best| value < objective[best]) {
                min_col = Some(j);
            }
        }
        min_col
    }

    /// Minimum ratio test over rows with a strictly positive entry, first row on ties
    pub(crate) fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs_col = tableau.num_variables();

        let mut min_ratio = f64::INFINITY;
        let mut min_row = None;

        for i in 1..tableau.rows() {
            let val = tableau.data[i][col];
            if val > 0.0 {
                let ratio = tableau.data[i][rhs_col] / val;
                if min_row.is_none() || ratio < min_ratio {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    /// Gauss-Jordan elimination around `(row, col)`, making `col` basic in `row`
    pub(crate) fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let tol = self.tolerance;

        // Scale pivot row
        let pivot_val = tableau.data[row][col];
        for value in tableau.data[row].iter_mut() {
            *value = clamp(*value / pivot_val, tol);
        }
        tableau.data[row][col] = 1.0;

        // Eliminate column in other rows
        let pivot_row = tableau.data[row].clone();
        for (i, current) in tableau.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = current[col];
            if factor == 0.0 {
                continue;
            }
            for (value, &p) in current.iter_mut().zip(&pivot_row) {
                *value = clamp(*value - factor * p, tol);
            }
            current[col] = 0.0;
        }

        tableau.basis[row - 1] = Some(col);
    }

    /// Read structural variable values off an optimal tableau.
    ///
    /// Basic variables take their row's right-hand side, the rest are zero.
    /// A basic column that is not a unit vector is reported, not skipped.
    pub(crate) fn extract_solution(
        &self,
        tableau: &Tableau,
        structural: usize,
        iterations: usize,
    ) -> Result<Solution, SolveError> {
        let mut values = vec![0.0; structural];

        for (index, basic) in tableau.basis.iter().enumerate() {
            let Some(col) = *basic else {
                continue;
            };
            let row = index + 1;
            if !self.is_unit_column(tableau, col, row) {
                return Err(SolveError::InvariantViolation(format!(
                    "column {} ({}) is basic in row {} but is not a unit vector",
                    col, tableau.variables[col], row
                )));
            }
            if col < structural {
                values[col] = tableau.rhs(row);
            }
        }

        Ok(Solution {
            variables: tableau.variables[..structural].to_vec(),
            values,
            objective_value: tableau.rhs(0),
            iterations,
        })
    }

    fn is_unit_column(&self, tableau: &Tableau, col: usize, row: usize) -> bool {
        tableau.data.iter().enumerate().all(|(i, r)| {
            let expected = if i == row { 1.0 } else { 0.0 };
            (r[col] - expected).abs() <= self.tolerance
        })
    }
}

fn clamp(value: f64, tol: f64) -> f64 {
    if value.abs() < tol { 0.0 } else { value }
}
