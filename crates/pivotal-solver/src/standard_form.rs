use std::collections::{HashMap, HashSet};

use crate::error::ModelError;
use crate::problem::{Constraint, ConstraintOp, Model, Term};

/// A model rewritten so that every constraint is an equality.
///
/// Each `<=` constraint gains `+1 * slack` and each `>=` constraint gains
/// `-1 * slack`, with slack variables appended after the structural ones in
/// the order of their constraints. Equalities pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardForm {
    pub(crate) variables: Vec<String>,
    pub(crate) structural: usize,
    pub(crate) columns: HashMap<String, usize>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Vec<Term>,
}

impl StandardForm {
    /// # Errors
    ///
    /// Fails if the model does not pass [`Model::validate`].
    pub fn from_model(model: &Model) -> Result<Self, ModelError> {
        model.validate()?;

        let mut variables = model.variables().to_vec();
        let mut used: HashSet<String> = variables.iter().cloned().collect();
        let mut next_slack = 0;

        let constraints = model
            .constraints()
            .iter()
            .map(|c| {
                let mut c = c.clone();
                let sign = match c.op {
                    ConstraintOp::Le => 1.0,
                    ConstraintOp::Ge => -1.0,
                    ConstraintOp::Eq => return c,
                };
                let slack = fresh_slack_name(&mut used, &mut next_slack);
                c.terms.push(Term::new(sign, slack.clone()));
                c.op = ConstraintOp::Eq;
                variables.push(slack);
                c
            })
            .collect();

        let columns = variables
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Self {
            variables,
            structural: model.num_variables(),
            columns,
            constraints,
            objective: model.objective().to_vec(),
        })
    }

    /// Structural variables followed by slacks
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn structural_variables(&self) -> &[String] {
        &self.variables[..self.structural]
    }

    pub fn slack_variables(&self) -> &[String] {
        &self.variables[self.structural..]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[Term] {
        &self.objective
    }

    /// Tableau column assigned to a variable
    pub fn column(&self, variable: &str) -> Option<usize> {
        self.columns.get(variable).copied()
    }
}

/// Next `s<k>` name not already taken by a declared variable or earlier slack
fn fresh_slack_name(used: &mut HashSet<String>, counter: &mut usize) -> String {
    loop {
        let name = format!("s{}", counter);
        *counter += 1;
        if used.insert(name.clone()) {
            return name;
        }
    }
}
