// src/expr/mod.rs

//! The expectation mini-language.
//!
//! An expectation is a `${{ ... }}` string checked against live simulation
//! state when a trigger fires. It is parsed once at load time
//! ([`parser`]) and evaluated every time its trigger fires ([`eval`]).
//!
//! Errors never escape a trigger: anything that cannot be parsed or
//! resolved evaluates to "no result", which fails the check.

pub mod duration;
pub mod eval;
pub mod parser;

use thiserror::Error;
use tracing::{error, warn};

pub use duration::parse_duration;
pub use eval::{EvalContext, FunctionResolver, NoFunctions, TOLERANCE, evaluate};
pub use parser::{CompareOp, Expr, Operand, parse_expectation};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("expectation '{0}' must be wrapped in ${{{{ ... }}}}")]
    MissingDelimiters(String),

    #[error("empty expression")]
    Empty,

    #[error(
        "malformed expression '{0}'; expected '<operand> <op> <operand>' or '[!]<trigger>.<function>(<param>)'"
    )]
    Malformed(String),

    #[error("missing {side} operand in '{expr}'")]
    MissingOperand { side: &'static str, expr: String },

    #[error("unable to resolve operand '{0}'")]
    UnresolvedOperand(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("unknown trigger '{0}'")]
    UnknownTrigger(String),

    #[error("trigger '{trigger}' has no function '{function}'")]
    UnknownFunction { trigger: String, function: String },
}

impl ExprError {
    /// True for errors in the expression text itself, as opposed to names
    /// that did not resolve against the current state.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ExprError::MissingDelimiters(_)
                | ExprError::Empty
                | ExprError::Malformed(_)
                | ExprError::MissingOperand { .. }
        )
    }
}

/// A single `${{ ... }}` check attached to a trigger.
#[derive(Debug, Clone)]
pub struct Expectation {
    source: String,
    parsed: Result<Expr, ExprError>,
}

impl Expectation {
    /// Parse `source`. A syntax error is kept and reported on evaluation.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let parsed = parse_expectation(&source);
        if let Err(ref e) = parsed {
            warn!(expectation = %source, error = %e, "expectation will never pass");
        }
        Self { source, parsed }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Result<&Expr, &ExprError> {
        self.parsed.as_ref()
    }

    /// Evaluate, mapping any error to the raw `Err`.
    pub fn try_evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, ExprError> {
        match &self.parsed {
            Ok(expr) => evaluate(expr, ctx),
            Err(e) => Err(e.clone()),
        }
    }

    /// Evaluate, logging and returning `None` when there is no result.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Option<bool> {
        match self.try_evaluate(ctx) {
            Ok(v) => Some(v),
            Err(e) => {
                error!(
                    expectation = %self.source,
                    error = %e,
                    parse_error = e.is_parse_error(),
                    "unable to evaluate expectation"
                );
                None
            }
        }
    }
}
