use super::dispatcher::{Behavior, Call};
use super::registry::Registry;
use super::rule::{Match, Rule};
use crate::{Result, Value};
use std::fmt;

/// One overload: a rule per argument position and the behavior it guards.
pub struct Route<S = ()> {
    rules: Vec<Rule>,
    behavior: Behavior<S>,
}

impl<S> Route<S> {
    pub fn new(rules: Vec<Rule>, behavior: Behavior<S>) -> Self {
        Route { rules, behavior }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Match `args` against the rules, rewriting them in place on success.
    ///
    /// ```text
    /// rules  ["string", ["int", -5], {size: ["number", 0]}]
    /// args   ["hi"]                     (slots past the end are undefined)
    /// after  ["hi", -5, {size: 0}]
    /// ```
    ///
    /// Shape matches merge into an object already in the slot. An absent,
    /// `null` or non-object slot receives the matched fields as a new object.
    /// Scalar matches replace the slot. On failure `args` is left untouched.
    pub fn test(&self, registry: &Registry, args: &mut Vec<Value>) -> Result<bool> {
        if args.len() > self.rules.len() {
            return Ok(false);
        }

        let mut matched = Vec::with_capacity(self.rules.len());
        for (idx, rule) in self.rules.iter().enumerate() {
            match rule.test(registry, args.get(idx).unwrap_or(&Value::Undefined))? {
                Some(found) => matched.push(found),
                None => return Ok(false),
            }
        }

        args.resize(self.rules.len(), Value::Undefined);
        for (slot, found) in args.iter_mut().zip(matched) {
            match found {
                Match::Shape(fields) => match slot.as_object_mut() {
                    Some(existing) => existing.extend(fields),
                    None => *slot = Value::Object(fields),
                },
                Match::Value(value) => *slot = value,
            }
        }
        Ok(true)
    }

    pub(crate) fn run(&self, call: &Call<'_, '_, S>, args: Vec<Value>) -> Result<Value> {
        (self.behavior)(call, args)
    }
}

impl<S> fmt::Display for Route<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, rule) in self.rules.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{rule}")?;
        }
        f.write_str(")")
    }
}

impl<S> fmt::Debug for Route<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("rules", &self.rules).finish_non_exhaustive()
    }
}
