use pivotal_solver::ConstraintOp;

use crate::lexer::Span;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Variables(VariableDecl),
    Objective(Objective),
    Constraint(ConstraintDecl),
}

/// `var x, y, z`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub span: Span,
    pub names: Vec<Ident>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub span: Span,
    pub name: String,
}

/// `maximize 2x + 3y`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub span: Span,
    pub terms: Vec<TermExpr>,
}

/// `4x + 2y <= 10`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDecl {
    pub span: Span,
    pub terms: Vec<TermExpr>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

/// A signed coefficient applied to a variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TermExpr {
    pub span: Span,
    pub coefficient: f64,
    pub variable: Ident,
}

impl Program {
    pub fn variable_count(&self) -> usize {
        self.statements
            .iter()
            .map(|s| match s {
                Statement::Variables(decl) => decl.names.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn constraint_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| matches!(s, Statement::Constraint(_)))
            .count()
    }
}
