use std::collections::HashSet;
use std::fmt;

use crate::error::{Location, ModelError, SolveError};
use crate::simplex::Solver;
use crate::solution::{ConstraintViolation, Solution};

/// A `coefficient * variable` product, with the variable referenced by name
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub coefficient: f64,
    pub variable: String,
}

impl Term {
    pub fn new(coefficient: f64, variable: impl Into<String>) -> Self {
        Self {
            coefficient,
            variable: variable.into(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "=",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Left-hand side; order only matters for display
    pub terms: Vec<Term>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

impl Constraint {
    pub fn new(terms: Vec<Term>, op: ConstraintOp, rhs: f64) -> Self {
        Self { terms, op, rhs }
    }

    /// Value of the left-hand side under an assignment
    pub fn lhs_value(&self, value_of: impl Fn(&str) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient * value_of(&t.variable))
            .sum()
    }

    /// How far a left-hand side value misses the relation, `None` within tolerance
    pub fn violation(&self, lhs: f64, tolerance: f64) -> Option<f64> {
        let amount = match self.op {
            ConstraintOp::Le => lhs - self.rhs,
            ConstraintOp::Ge => self.rhs - lhs,
            ConstraintOp::Eq => (lhs - self.rhs).abs(),
        };
        (amount > tolerance).then_some(amount)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        write_terms(f, &self.terms)?;
        write!(f, ") {} {}", self.op, self.rhs)
    }
}

/// A linear program: maximize the objective subject to the constraints,
/// with every variable implicitly non-negative.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    variables: Vec<String>,
    constraints: Vec<Constraint>,
    #[cfg_attr(feature = "serde", serde(default))]
    objective: Vec<Term>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>) {
        self.variables.push(name.into());
    }

    pub fn add_constraint(&mut self, terms: Vec<Term>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint::new(terms, op, rhs));
    }

    /// Replaces any previously set objective
    pub fn set_objective(&mut self, terms: Vec<Term>) {
        self.objective = terms;
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[Term] {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Checks names and numbers before a tableau is built.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found: an empty or repeated
    /// variable name, a term naming an undeclared variable, or a non-finite
    /// coefficient or right-hand side.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut declared = HashSet::with_capacity(self.variables.len());
        for name in &self.variables {
            if name.is_empty() {
                return Err(ModelError::EmptyVariableName);
            }
            if !declared.insert(name.as_str()) {
                return Err(ModelError::DuplicateVariable(name.clone()));
            }
        }

        for term in &self.objective {
            check_term(&declared, term, Location::Objective)?;
        }

        for (i, c) in self.constraints.iter().enumerate() {
            for term in &c.terms {
                check_term(&declared, term, Location::Constraint(i))?;
            }
            if !c.rhs.is_finite() {
                return Err(ModelError::NonFiniteRhs {
                    constraint: i,
                    value: c.rhs,
                });
            }
        }

        Ok(())
    }

    /// Solve with the default solver settings
    pub fn solve(&self) -> Result<Solution, SolveError> {
        Solver::new().solve(self)
    }

    /// Objective evaluated at a solution's variable values
    pub fn objective_value(&self, solution: &Solution) -> f64 {
        self.objective
            .iter()
            .map(|t| t.coefficient * solution.value(&t.variable).unwrap_or(0.0))
            .sum()
    }

    /// Find which constraints a solution violates, worst first
    pub fn violations(&self, solution: &Solution, tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations: Vec<_> = self
            .constraints
            .iter()
            .enumerate()
            .filter_map(|(index, c)| {
                let actual = c.lhs_value(|name| solution.value(name).unwrap_or(0.0));
                let amount = c.violation(actual, tolerance)?;
                Some(ConstraintViolation {
                    constraint: index,
                    required: c.rhs,
                    actual,
                    violation_amount: amount,
                    description: format!("{} misses by {} with left-hand side {}", c, amount, actual),
                })
            })
            .collect();

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }
}

fn check_term(declared: &HashSet<&str>, term: &Term, location: Location) -> Result<(), ModelError> {
    if !declared.contains(term.variable.as_str()) {
        return Err(ModelError::UnknownVariable {
            variable: term.variable.clone(),
            location,
        });
    }
    if !term.coefficient.is_finite() {
        return Err(ModelError::NonFiniteCoefficient {
            variable: term.variable.clone(),
            value: term.coefficient,
            location,
        });
    }
    Ok(())
}

fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " + ")?;
        }
        write!(f, "{}*{}", term.coefficient, term.variable)?;
    }
    Ok(())
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Variables: {}", self.variables.join(" "))?;
        writeln!(f, "Constraints:")?;
        for c in &self.constraints {
            writeln!(f, "  {}", c)?;
        }
        write!(f, "Objective: maximize ")?;
        write_terms(f, &self.objective)?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Model {
        let mut model = Model::new();
        model.add_variable("x");
        model.add_variable("y");
        model.add_constraint(
            vec![Term::new(1.0, "x"), Term::new(1.0, "y")],
            ConstraintOp::Le,
            4.0,
        );
        model.add_constraint(vec![Term::new(1.0, "x")], ConstraintOp::Ge, 1.0);
        model.set_objective(vec![Term::new(3.0, "x"), Term::new(2.0, "y")]);
        model
    }

    fn solution(x: f64, y: f64) -> Solution {
        Solution {
            variables: vec!["x".to_string(), "y".to_string()],
            values: vec![x, y],
            objective_value: 0.0,
            iterations: 0,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_model() {
        assert_eq!(example().validate(), Ok(()));
    }

    #[test]
    fn test_validate_unknown_variable() {
        let mut model = example();
        model.add_constraint(vec![Term::new(2.0, "z")], ConstraintOp::Le, 1.0);
        assert_eq!(
            model.validate(),
            Err(ModelError::UnknownVariable {
                variable: "z".to_string(),
                location: Location::Constraint(2),
            })
        );
    }

    #[test]
    fn test_validate_unknown_objective_variable() {
        let mut model = example();
        model.set_objective(vec![Term::new(1.0, "w")]);
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnknownVariable { location: Location::Objective, .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_and_empty_names() {
        let mut model = example();
        model.add_variable("x");
        assert_eq!(model.validate(), Err(ModelError::DuplicateVariable("x".to_string())));

        let mut model = Model::new();
        model.add_variable("");
        assert_eq!(model.validate(), Err(ModelError::EmptyVariableName));
    }

    #[test]
    fn test_validate_non_finite_numbers() {
        let mut model = example();
        model.add_constraint(vec![Term::new(f64::NAN, "x")], ConstraintOp::Le, 1.0);
        assert!(matches!(
            model.validate(),
            Err(ModelError::NonFiniteCoefficient { .. })
        ));

        let mut model = example();
        model.add_constraint(vec![Term::new(1.0, "x")], ConstraintOp::Le, f64::INFINITY);
        assert!(matches!(
            model.validate(),
            Err(ModelError::NonFiniteRhs { constraint: 2, .. })
        ));
    }

    #[test]
    fn test_set_objective_replaces_previous() {
        let mut model = example();
        model.set_objective(vec![Term::new(1.0, "y")]);
        assert_eq!(model.objective(), &[Term::new(1.0, "y")]);
    }

    #[test]
    fn test_violations_worst_first() {
        let model = example();
        assert!(model.violations(&solution(1.0, 3.0), 1e-9).is_empty());

        // x + y = 5.5 breaks the first constraint by 1.5, x = 0 breaks the second by 1
        let violations = model.violations(&solution(0.0, 5.5), 1e-9);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].constraint, 0);
        assert!((violations[0].violation_amount - 1.5).abs() < 1e-12);
        assert_eq!(violations[1].constraint, 1);
        assert!((violations[1].actual - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_constraint_violation_amount() {
        let le = Constraint::new(vec![Term::new(1.0, "x")], ConstraintOp::Le, 4.0);
        assert_eq!(le.violation(4.0, 1e-9), None);
        assert_eq!(le.violation(3.0, 1e-9), None);
        assert_eq!(le.violation(6.0, 1e-9), Some(2.0));

        let ge = Constraint::new(vec![Term::new(1.0, "x")], ConstraintOp::Ge, 4.0);
        assert_eq!(ge.violation(5.0, 1e-9), None);
        assert_eq!(ge.violation(1.0, 1e-9), Some(3.0));

        let eq = Constraint::new(vec![Term::new(1.0, "x")], ConstraintOp::Eq, 4.0);
        assert_eq!(eq.violation(4.0 + 1e-12, 1e-9), None);
        assert_eq!(eq.violation(3.5, 1e-9), Some(0.5));
        assert_eq!(eq.violation(4.5, 1e-9), Some(0.5));
    }

    #[test]
    fn test_objective_value() {
        let model = example();
        assert!((model.objective_value(&solution(2.0, 1.0)) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let text = example().to_string();
        assert!(text.starts_with("Variables: x y\n"));
        assert!(text.contains("  (1*x + 1*y) <= 4\n"));
        assert!(text.contains("  (1*x) >= 1\n"));
        assert!(text.ends_with("Objective: maximize 3*x + 2*y\n"));
    }
}
