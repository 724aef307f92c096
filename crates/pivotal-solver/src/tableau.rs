use std::fmt;

use crate::standard_form::StandardForm;

/// Dense simplex tableau.
///
/// Row 0 holds the negated objective coefficients, rows `1..=m` hold the
/// equality constraints. The last column is the right-hand side. Every
/// constraint row with a basic variable keeps that variable's column as a
/// unit vector (1 in the row, 0 everywhere else, row 0 included).
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    pub(crate) data: Vec<Vec<f64>>,
    /// Column labels, one per variable
    pub(crate) variables: Vec<String>,
    /// Basic column of each constraint row (`basis[i]` belongs to row `i + 1`)
    pub(crate) basis: Vec<Option<usize>>,
}

impl Tableau {
    /// Lay out a standard-form model as a `(m + 1) x (n + 1)` matrix
    pub fn build(form: &StandardForm) -> Self {
        let n_vars = form.variables.len();
        let n_constraints = form.constraints.len();
        let rhs_col = n_vars;

        let mut data = vec![vec![0.0; n_vars + 1]; n_constraints + 1];

        // Columns resolve through the name map; `StandardForm` only exists for validated models
        for term in &form.objective {
            data[0][form.columns[&term.variable]] -= term.coefficient;
        }

        for (i, c) in form.constraints.iter().enumerate() {
            for term in &c.terms {
                data[i + 1][form.columns[&term.variable]] += term.coefficient;
            }
            data[i + 1][rhs_col] = c.rhs;
        }

        let mut tableau = Self {
            data,
            variables: form.variables.clone(),
            basis: vec![None; n_constraints],
        };
        let basis = (1..=n_constraints)
            .map(|row| tableau.initial_basic_column(row, form.structural))
            .collect();
        tableau.basis = basis;
        tableau
    }

    /// Slack columns are tried before structural ones so that `<=` rows start
    /// with their slack basic.
    fn initial_basic_column(&self, row: usize, structural: usize) -> Option<usize> {
        let n_vars = self.variables.len();
        (structural..n_vars)
            .chain(0..structural)
            .find(|&col| self.is_exact_unit_column(col, row))
    }

    fn is_exact_unit_column(&self, col: usize, row: usize) -> bool {
        self.data
            .iter()
            .enumerate()
            .all(|(i, r)| r[col] == if i == row { 1.0 } else { 0.0 })
    }

    /// Rows including the objective row
    pub fn rows(&self) -> usize {
        self.data.len()
    }

    /// Columns including the right-hand side
    pub fn cols(&self) -> usize {
        self.variables.len() + 1
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row]
    }

    pub fn rhs(&self, row: usize) -> f64 {
        self.data[row][self.variables.len()]
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Basic column of each constraint row, in row order
    pub fn basis(&self) -> &[Option<usize>] {
        &self.basis
    }

    #[cfg(test)]
    pub(crate) fn from_rows(variables: &[&str], data: Vec<Vec<f64>>, basis: Vec<Option<usize>>) -> Self {
        Self {
            data,
            variables: variables.iter().map(|v| v.to_string()).collect(),
            basis,
        }
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "")?;
        for name in &self.variables {
            write!(f, " {:>9}", name)?;
        }
        writeln!(f, " {:>9}", "rhs")?;

        for (i, row) in self.data.iter().enumerate() {
            let label = match i {
                0 => "z".to_string(),
                _ => self.basis[i - 1]
                    .map(|col| self.variables[col].clone())
                    .unwrap_or_else(|| "-".to_string()),
            };
            write!(f, "{:>6}", label)?;
            for value in row {
                write!(f, " {:>9.4}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ConstraintOp, Model, Term};

    fn build(model: &Model) -> Tableau {
        Tableau::build(&StandardForm::from_model(model).unwrap())
    }

    fn example() -> Model {
        let mut model = Model::new();
        for name in ["x", "y", "z"] {
            model.add_variable(name);
        }
        model.add_constraint(
            vec![Term::new(4.0, "x"), Term::new(2.0, "y"), Term::new(1.0, "z")],
            ConstraintOp::Le,
            10.0,
        );
        model.add_constraint(
            vec![Term::new(2.0, "x"), Term::new(5.0, "y"), Term::new(3.0, "z")],
            ConstraintOp::Le,
            15.0,
        );
        model.set_objective(vec![Term::new(2.0, "x"), Term::new(3.0, "y"), Term::new(4.0, "z")]);
        model
    }

    #[test]
    fn test_layout() {
        let tableau = build(&example());

        assert_eq!(tableau.rows(), 3);
        assert_eq!(tableau.cols(), 6);
        assert_eq!(tableau.row(0), &[-2.0, -3.0, -4.0, 0.0, 0.0, 0.0]);
        assert_eq!(tableau.row(1), &[4.0, 2.0, 1.0, 1.0, 0.0, 10.0]);
        assert_eq!(tableau.row(2), &[2.0, 5.0, 3.0, 0.0, 1.0, 15.0]);
        assert_eq!(tableau.basis(), &[Some(3), Some(4)]);
    }

    #[test]
    fn test_missing_objective_terms_are_zero() {
        let mut model = example();
        model.set_objective(vec![Term::new(1.0, "y")]);
        let tableau = build(&model);
        assert_eq!(tableau.row(0), &[0.0, -1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_duplicate_terms_accumulate() {
        let mut model = Model::new();
        model.add_variable("x");
        model.add_constraint(
            vec![Term::new(1.5, "x"), Term::new(2.0, "x")],
            ConstraintOp::Le,
            7.0,
        );
        let tableau = build(&model);
        assert_eq!(tableau.row(1), &[3.5, 1.0, 7.0]);
    }

    #[test]
    fn test_duplicate_objective_terms_accumulate() {
        let mut model = example();
        model.set_objective(vec![
            Term::new(1.0, "x"),
            Term::new(-1.0, "x"),
            Term::new(2.0, "y"),
            Term::new(0.5, "y"),
        ]);
        let tableau = build(&model);
        assert_eq!(tableau.row(0), &[0.0, -2.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ge_and_eq_rows_without_slack_basis() {
        let mut model = Model::new();
        model.add_variable("x");
        model.add_variable("y");
        model.add_constraint(vec![Term::new(1.0, "x"), Term::new(1.0, "y")], ConstraintOp::Ge, 2.0);
        model.add_constraint(vec![Term::new(1.0, "y")], ConstraintOp::Eq, 1.0);
        model.set_objective(vec![Term::new(1.0, "x")]);

        let tableau = build(&model);
        assert_eq!(tableau.row(1), &[1.0, 1.0, -1.0, 2.0]);
        assert_eq!(tableau.row(2), &[0.0, 1.0, 0.0, 1.0]);
        // Neither row has a column that is a unit vector
        assert_eq!(tableau.basis(), &[None, None]);
    }

    #[test]
    fn test_display_labels_basis() {
        let text = build(&example()).to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("rhs"));
        assert!(lines[1].trim_start().starts_with('z'));
        assert!(lines[2].trim_start().starts_with("s0"));
        assert!(lines[3].trim_start().starts_with("s1"));
    }
}
