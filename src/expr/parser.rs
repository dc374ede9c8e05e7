// src/expr/parser.rs

//! Parsing of `${{ ... }}` expectation strings into an [`Expr`].
//!
//! Grammar:
//!
//! ```text
//! expectation  := "${{" SP* expr SP* "}}"
//! expr         := equation | funccall
//! equation     := operand op operand
//! op           := "==" | "!=" | ">=" | "<="
//! operand      := number | duration | "simulation.time" | entityPath
//! entityPath   := entityName "." "pose" "." field
//! funccall     := ["!"] triggerName "." functionName "(" param ")"
//! ```
//!
//! There is exactly one comparison per expression, so no precedence rules.

use std::fmt;

use crate::sim::PoseField;

use super::ExprError;
use super::duration::{is_duration_literal, parse_duration};

const OPEN: &str = "${{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
}

impl CompareOp {
    const TOKENS: [(&'static str, CompareOp); 4] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
    ];

    pub fn token(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One side of an equation, classified at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    /// A duration literal, already converted to seconds.
    Duration(f64),
    SimTime,
    Pose { entity: String, field: PoseField },
    /// Text that matched none of the operand forms; fails at evaluation.
    Unresolved(String),
}

impl Operand {
    /// Classify operand text, trying each form in order.
    pub fn parse(text: &str) -> Operand {
        let text = text.trim();

        if let Ok(n) = text.parse::<f64>() {
            return Operand::Number(n);
        }

        if is_duration_literal(text) {
            if let Ok(d) = parse_duration(text) {
                return Operand::Duration(d.as_secs_f64());
            }
        }

        if text == "simulation.time" {
            return Operand::SimTime;
        }

        if let Some((rest, field)) = text.rsplit_once('.') {
            if let Some((entity, "pose")) = rest.rsplit_once('.') {
                if let (false, Some(field)) = (entity.is_empty(), PoseField::parse(field)) {
                    return Operand::Pose {
                        entity: entity.to_string(),
                        field,
                    };
                }
            }
        }

        Operand::Unresolved(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    Call {
        negate: bool,
        target: String,
        function: String,
        param: String,
    },
}

/// Strip the `${{ }}` delimiters and surrounding whitespace.
pub fn strip_delimiters(source: &str) -> Result<&str, ExprError> {
    let trimmed = source.trim();
    trimmed
        .strip_prefix(OPEN)
        .and_then(|s| s.strip_suffix(CLOSE))
        .map(str::trim)
        .ok_or_else(|| ExprError::MissingDelimiters(source.to_string()))
}

/// Parse a full expectation string, delimiters included.
pub fn parse_expectation(source: &str) -> Result<Expr, ExprError> {
    let body = strip_delimiters(source)?;
    parse_expr(body)
}

/// Parse an expression body (no delimiters).
pub fn parse_expr(body: &str) -> Result<Expr, ExprError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ExprError::Empty);
    }

    if let Some((pos, op)) = find_operator(body) {
        let lhs = body[..pos].trim();
        let rhs = body[pos + op.token().len()..].trim();
        if lhs.is_empty() {
            return Err(ExprError::MissingOperand {
                side: "left",
                expr: body.to_string(),
            });
        }
        if rhs.is_empty() {
            return Err(ExprError::MissingOperand {
                side: "right",
                expr: body.to_string(),
            });
        }
        return Ok(Expr::Compare {
            lhs: Operand::parse(lhs),
            op,
            rhs: Operand::parse(rhs),
        });
    }

    parse_call(body)
}

/// Position and kind of the first comparison operator in `body`.
fn find_operator(body: &str) -> Option<(usize, CompareOp)> {
    body.char_indices().find_map(|(i, _)| {
        let rest = &body[i..];
        CompareOp::TOKENS
            .iter()
            .find(|(tok, _)| rest.starts_with(tok))
            .map(|&(_, op)| (i, op))
    })
}

fn parse_call(body: &str) -> Result<Expr, ExprError> {
    let malformed = || ExprError::Malformed(body.to_string());

    let (negate, call) = match body.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, body),
    };

    let open = call.find('(').ok_or_else(malformed)?;
    let close = call.rfind(')').ok_or_else(malformed)?;
    if close < open || !call[close + 1..].trim().is_empty() {
        return Err(malformed());
    }

    let (target, function) = call[..open].trim().rsplit_once('.').ok_or_else(malformed)?;
    let (target, function) = (target.trim(), function.trim());
    if target.is_empty() || function.is_empty() {
        return Err(malformed());
    }

    Ok(Expr::Call {
        negate,
        target: target.to_string(),
        function: function.to_string(),
        param: call[open + 1..close].trim().to_string(),
    })
}
