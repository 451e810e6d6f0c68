//! Single-argument matchers.
//!
//! A [`Rule`] is built from a [`RuleDescriptor`]:
//!
//! ```text
//! "int"                          scalar: value must satisfy the expression
//! ["int", -5]                    scalar with a default for an absent value
//! { size: ["number", 0], ... }   shape: each field has its own rule
//! [{ ... }, { ... }]             shape with a default object for unset input
//! ```
//!
//! ## The absent value
//!
//! `undefined` is both "no value supplied" and the legacy "no match" sentinel.
//! Match results are `Option<Match>`, but the legacy limitation is kept: a
//! scalar rule never matches `undefined` as a value, even when its expression
//! accepts it (`"any"` and `"undefined"` included), and such a rule does not
//! fall back to its default either.

use super::expr::Expr;
use super::registry::Registry;
use crate::{Error, Result, Value};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Declarative form of a [`Rule`]. See the [`rule!`](crate::rule) macro.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDescriptor {
    /// A type expression.
    Type(String),
    /// Field name to nested descriptor, in declaration order.
    Shape(IndexMap<String, RuleDescriptor>),
    /// A type or shape descriptor plus its default value.
    Defaulted(Box<RuleDescriptor>, Value),
}

impl RuleDescriptor {
    pub fn shape<K: Into<String>>(fields: impl IntoIterator<Item = (K, RuleDescriptor)>) -> Self {
        RuleDescriptor::Shape(fields.into_iter().map(|(k, d)| (k.into(), d)).collect())
    }

    pub fn with_default(self, default: impl Into<Value>) -> Self {
        RuleDescriptor::Defaulted(Box::new(self), default.into())
    }
}

impl From<&str> for RuleDescriptor {
    fn from(expression: &str) -> Self {
        RuleDescriptor::Type(expression.to_string())
    }
}

impl From<String> for RuleDescriptor {
    fn from(expression: String) -> Self {
        RuleDescriptor::Type(expression)
    }
}

/// Read a descriptor from its dynamic form: a string, an object of
/// descriptors, or a `[descriptor, default]` pair.
impl TryFrom<&Value> for RuleDescriptor {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        let improper = || Error::InvalidRuleDescriptor { descriptor: value.to_string() };

        match value {
            Value::String(expression) => Ok(RuleDescriptor::Type(expression.clone())),
            Value::Object(fields) => fields
                .iter()
                .map(|(key, field)| Ok((key.clone(), RuleDescriptor::try_from(field)?)))
                .collect::<Result<IndexMap<_, _>>>()
                .map(RuleDescriptor::Shape),
            Value::Array(pair) if pair.len() == 2 => match &pair[0] {
                Value::String(_) | Value::Object(_) => {
                    Ok(RuleDescriptor::try_from(&pair[0])?.with_default(pair[1].clone()))
                }
                _ => Err(improper()),
            },
            _ => Err(improper()),
        }
    }
}

impl fmt::Display for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleDescriptor::Type(expression) => write!(f, "{expression:?}"),
            RuleDescriptor::Shape(fields) => {
                f.write_str("{")?;
                for (idx, (key, field)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {field}")?;
                }
                f.write_str("}")
            }
            RuleDescriptor::Defaulted(inner, default) => write!(f, "[{inner}, {default}]"),
        }
    }
}

/// A successful rule match.
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    Value(Value),
    /// Field name to matched field value, in declaration order.
    Shape(IndexMap<String, Value>),
}

impl Match {
    pub fn into_value(self) -> Value {
        match self {
            Match::Value(value) => value,
            Match::Shape(fields) => Value::Object(fields),
        }
    }
}

#[derive(Debug, Clone)]
enum RuleKind {
    Scalar { source: String, expr: Rc<Expr> },
    Shape(IndexMap<String, Rule>),
}

/// A compiled [`RuleDescriptor`]: a type expression or a field shape, with an
/// optional default.
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    default: Option<Value>,
}

impl Rule {
    /// Build a rule, compiling (but not yet resolving) every type expression.
    pub fn new(registry: &Registry, descriptor: &RuleDescriptor) -> Result<Self> {
        match descriptor {
            RuleDescriptor::Defaulted(inner, default) => match &**inner {
                RuleDescriptor::Defaulted(..) => {
                    Err(registry.report(Error::InvalidRuleDescriptor { descriptor: descriptor.to_string() }))
                }
                plain => Self::build(registry, plain, Some(default.clone())),
            },
            plain => Self::build(registry, plain, None),
        }
    }

    fn build(registry: &Registry, descriptor: &RuleDescriptor, default: Option<Value>) -> Result<Self> {
        let kind = match descriptor {
            RuleDescriptor::Type(source) if !source.trim().is_empty() => {
                RuleKind::Scalar { source: source.clone(), expr: registry.compile(source) }
            }
            RuleDescriptor::Shape(fields) => RuleKind::Shape(
                fields
                    .iter()
                    .map(|(key, field)| Ok((key.clone(), Rule::new(registry, field)?)))
                    .collect::<Result<_>>()?,
            ),
            _ => return Err(registry.report(Error::InvalidRuleDescriptor { descriptor: descriptor.to_string() })),
        };
        Ok(Rule { kind, default })
    }

    pub fn is_shape(&self) -> bool {
        matches!(self.kind, RuleKind::Shape(_))
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Match one argument. `Ok(None)` is "no match"; errors come from
    /// resolving the rule's type expressions.
    pub fn test(&self, registry: &Registry, value: &Value) -> Result<Option<Match>> {
        match &self.kind {
            RuleKind::Scalar { expr, .. } => {
                if registry.evaluate_expr(expr, value)? {
                    return Ok((!value.is_undefined()).then(|| Match::Value(value.clone())));
                }
                if value.is_undefined() {
                    return Ok(self.default.clone().filter(|d| !d.is_undefined()).map(Match::Value));
                }
                Ok(None)
            }
            RuleKind::Shape(fields) => {
                let working = match &self.default {
                    Some(default) if value.is_unset() => default,
                    _ => value,
                };
                let Some(object) = working.as_object() else {
                    return Ok(None);
                };

                let mut matched = IndexMap::with_capacity(fields.len());
                for (key, rule) in fields {
                    match rule.test(registry, object.get(key).unwrap_or(&Value::Undefined))? {
                        Some(field) => {
                            matched.insert(key.clone(), field.into_value());
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some(Match::Shape(matched)))
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.default.is_some() {
            f.write_str("[")?;
        }
        match &self.kind {
            RuleKind::Scalar { source, .. } => write!(f, "{source:?}")?,
            RuleKind::Shape(fields) => {
                f.write_str("{")?;
                for (idx, (key, rule)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {rule}")?;
                }
                f.write_str("}")?;
            }
        }
        match &self.default {
            Some(default) => write!(f, ", {default}]"),
            None => Ok(()),
        }
    }
}
