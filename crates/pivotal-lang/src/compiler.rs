use std::collections::HashSet;

use pivotal_solver::{Model, ModelError, Term};
use thiserror::Error;

use crate::ast::*;
use crate::lexer::Span;
use crate::parser::{ParseError, Parser};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Unknown variable '{name}' at position {span:?}")]
    UnknownVariable { name: String, span: Span },
    #[error("Variable '{name}' declared again at position {span:?}")]
    DuplicateVariable { name: String, span: Span },
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),
}

/// Lower a parsed program into a solver model.
///
/// Variables may be declared anywhere in the program. Objectives replace
/// each other, so the last `maximize` wins.
pub fn compile(program: &Program) -> Result<Model, CompileError> {
    let mut declared = HashSet::new();
    let mut model = Model::new();

    for statement in &program.statements {
        if let Statement::Variables(decl) = statement {
            for ident in &decl.names {
                if !declared.insert(ident.name.as_str()) {
                    return Err(CompileError::DuplicateVariable {
                        name: ident.name.clone(),
                        span: ident.span,
                    });
                }
                model.add_variable(ident.name.clone());
            }
        }
    }

    for statement in &program.statements {
        match statement {
            Statement::Variables(_) => {}
            Statement::Objective(objective) => {
                model.set_objective(lower_terms(&declared, &objective.terms)?);
            }
            Statement::Constraint(c) => {
                model.add_constraint(lower_terms(&declared, &c.terms)?, c.op, c.rhs);
            }
        }
    }

    model.validate()?;
    Ok(model)
}

/// Parse and compile in one step
pub fn compile_source(source: &str) -> Result<Model, CompileError> {
    let program = Parser::parse(source)?;
    compile(&program)
}

fn lower_terms(declared: &HashSet<&str>, terms: &[TermExpr]) -> Result<Vec<Term>, CompileError> {
    terms
        .iter()
        .map(|t| {
            if !declared.contains(t.variable.name.as_str()) {
                return Err(CompileError::UnknownVariable {
                    name: t.variable.name.clone(),
                    span: t.variable.span,
                });
            }
            Ok(Term::new(t.coefficient, t.variable.name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pivotal_solver::{ConstraintOp, SolveError};

    use super::*;

    #[test]
    fn test_compile_and_solve() {
        let source = r#"
            var x, y, z
            maximize 2x + 3y + 4z
            4x + 2y + z <= 10
            2x + 5y + 3z <= 15
        "#;

        let model = compile_source(source).unwrap();
        assert_eq!(model.variables(), &["x", "y", "z"]);
        assert_eq!(model.num_constraints(), 2);
        assert_eq!(
            model.constraints()[0].terms,
            vec![Term::new(4.0, "x"), Term::new(2.0, "y"), Term::new(1.0, "z")]
        );

        let solution = model.solve().unwrap();
        assert_abs_diff_eq!(solution.objective_value, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_declaration_after_use() {
        let model = compile_source("x + y <= 3\nvar x\nvar y\nmax x").unwrap();
        assert_eq!(model.variables(), &["x", "y"]);
        assert_eq!(model.constraints()[0].op, ConstraintOp::Le);
    }

    #[test]
    fn test_last_objective_wins() {
        let model = compile_source("var a, b\nmax a\nmax 2b").unwrap();
        assert_eq!(model.objective(), &[Term::new(2.0, "b")]);
    }

    #[test]
    fn test_unknown_variable_has_span() {
        let err = compile_source("var x\nx + w <= 1").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownVariable {
                name: "w".to_string(),
                span: Span::new(10, 11),
            }
        );
    }

    #[test]
    fn test_duplicate_declaration() {
        let err = compile_source("var x, y\nvar x").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateVariable { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(matches!(compile_source("var x\nx <<= 1"), Err(CompileError::Parse(_))));
    }

    #[test]
    fn test_demo_files() {
        let model = compile_source(include_str!("../../../demos/resources.lp")).unwrap();
        let solution = model.solve().unwrap();
        assert!(model.violations(&solution, 1e-9).is_empty());
        assert_abs_diff_eq!(solution.value("z").unwrap(), 5.0, epsilon = 1e-9);

        let model = compile_source(include_str!("../../../demos/unbounded.lp")).unwrap();
        assert!(matches!(model.solve(), Err(SolveError::Unbounded { .. })));
    }

    #[test]
    fn test_unbounded_model_from_source() {
        let model = compile_source("var x\nmaximize x\nx >= 0").unwrap();
        assert!(matches!(model.solve(), Err(SolveError::Unbounded { .. })));
    }
}
