// src/trigger/functions.rs

//! Cross-trigger function dispatch.
//!
//! Each condition kind exposes a static table mapping a function name to a
//! pure predicate over its own state. A test resolves
//! `target.function(param)` by looking the target trigger up by name and
//! then the function in that trigger's table.

use std::collections::HashMap;

use crate::expr::{ExprError, FunctionResolver};

use super::{Condition, Trigger};

/// A named query over trigger-local state.
pub type Predicate = fn(&Condition, &str) -> bool;

const REGION_FUNCTIONS: &[(&str, Predicate)] = &[("contains", region_contains)];

fn region_contains(condition: &Condition, param: &str) -> bool {
    match condition {
        Condition::Region(region) => region.contains(param),
        _ => false,
    }
}

/// The dispatch table for a condition kind.
pub fn table(condition: &Condition) -> &'static [(&'static str, Predicate)] {
    match condition {
        Condition::Time(_) => &[],
        Condition::Region(_) => REGION_FUNCTIONS,
    }
}

pub fn lookup(condition: &Condition, function: &str) -> Option<Predicate> {
    table(condition)
        .iter()
        .find(|(name, _)| *name == function)
        .map(|&(_, f)| f)
}

/// Invoke `function(param)` on `trigger`.
pub fn call(trigger: &Trigger, function: &str, param: &str) -> Result<bool, ExprError> {
    let f = lookup(trigger.condition(), function).ok_or_else(|| ExprError::UnknownFunction {
        trigger: trigger.name().to_string(),
        function: function.to_string(),
    })?;
    Ok(f(trigger.condition(), param))
}

/// The other triggers of a test, seen while one trigger is being updated.
///
/// The updated trigger is split out of the slice, so `before` and `after`
/// hold everything else and `index` maps names to positions in the full
/// list.
pub struct Siblings<'a> {
    pub before: &'a [Trigger],
    pub after: &'a [Trigger],
    pub index: &'a HashMap<String, usize>,
}

impl FunctionResolver for Siblings<'_> {
    fn call(&self, target: &str, function: &str, param: &str) -> Result<bool, ExprError> {
        let unknown = || ExprError::UnknownTrigger(target.to_string());
        let &idx = self.index.get(target).ok_or_else(unknown)?;
        let current = self.before.len();

        let trigger = if idx < current {
            &self.before[idx]
        } else if idx > current {
            self.after.get(idx - current - 1).ok_or_else(unknown)?
        } else {
            return Err(unknown());
        };
        call(trigger, function, param)
    }
}

/// Resolves calls to the trigger being updated first, then to siblings.
pub(crate) struct WithSelf<'a> {
    pub me: &'a Trigger,
    pub others: &'a dyn FunctionResolver,
}

impl FunctionResolver for WithSelf<'_> {
    fn call(&self, target: &str, function: &str, param: &str) -> Result<bool, ExprError> {
        if target == self.me.name() {
            call(self.me, function, param)
        } else {
            self.others.call(target, function, param)
        }
    }
}
