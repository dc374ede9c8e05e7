// src/expr/eval.rs

//! Evaluation of parsed expressions against a simulation snapshot.

use crate::sim::{Snapshot, UpdateInfo};

use super::ExprError;
use super::parser::{CompareOp, Expr, Operand};

/// Absolute tolerance used by `==` and `!=`.
pub const TOLERANCE: f64 = 1e-6;

/// Resolves `target.function(param)` calls to sibling triggers.
pub trait FunctionResolver {
    fn call(&self, target: &str, function: &str, param: &str) -> Result<bool, ExprError>;
}

/// Resolver for contexts without any callable triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFunctions;

impl FunctionResolver for NoFunctions {
    fn call(&self, target: &str, _function: &str, _param: &str) -> Result<bool, ExprError> {
        Err(ExprError::UnknownTrigger(target.to_string()))
    }
}

/// Everything an expression may read while being evaluated.
pub struct EvalContext<'a> {
    pub info: &'a UpdateInfo,
    pub world: &'a dyn Snapshot,
    pub functions: &'a dyn FunctionResolver,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        info: &'a UpdateInfo,
        world: &'a dyn Snapshot,
        functions: &'a dyn FunctionResolver,
    ) -> Self {
        Self {
            info,
            world,
            functions,
        }
    }
}

pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool, ExprError> {
    match expr {
        Expr::Compare { lhs, op, rhs } => {
            let l = resolve_operand(lhs, ctx)?;
            let r = resolve_operand(rhs, ctx)?;
            Ok(compare(l, *op, r))
        }
        Expr::Call {
            negate,
            target,
            function,
            param,
        } => {
            let value = ctx.functions.call(target, function, param)?;
            Ok(value != *negate)
        }
    }
}

pub fn resolve_operand(operand: &Operand, ctx: &EvalContext<'_>) -> Result<f64, ExprError> {
    match operand {
        Operand::Number(n) | Operand::Duration(n) => Ok(*n),
        Operand::SimTime => Ok(ctx.info.sim_time.as_secs_f64()),
        Operand::Pose { entity, field } => ctx
            .world
            .world_pose(entity)
            .map(|pose| pose.field(*field))
            .ok_or_else(|| ExprError::UnknownEntity(entity.clone())),
        Operand::Unresolved(text) => Err(ExprError::UnresolvedOperand(text.clone())),
    }
}

/// Compare two resolved operands. `==`/`!=` are tolerance based.
pub fn compare(lhs: f64, op: CompareOp, rhs: f64) -> bool {
    match op {
        CompareOp::Eq => approx_eq(lhs, rhs),
        CompareOp::Ne => !approx_eq(lhs, rhs),
        CompareOp::Ge => lhs >= rhs,
        CompareOp::Le => lhs <= rhs,
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= TOLERANCE
}
