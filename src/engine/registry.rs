//! Predicate registry and expression cache.
//!
//! The registry owns two maps:
//!
//! ```text
//! predicates: name   ──▶ Predicate::{Atomic(Test), Alias(source)}
//! compiled:   source ──▶ Expr            (raw and normalized text both cached)
//! ```
//!
//! Names are resolved lazily: an expression compiles without looking its names
//! up, and evaluation fails with `UnknownType` at the first name it cannot
//! find. Redefining a name therefore affects every expression that refers to
//! it, cached or not.
//!
//! A source text that is itself a registered name always means that name. The
//! parser prefers registered names over keyword splitting, so binding a name
//! that is not a plain word (`"a or b"`) drops every cached parse.
//!
//! ## Re-entrancy
//!
//! Both maps sit behind `RefCell`s. No borrow is held while user code runs
//! (custom tests, error handlers), so a test may itself evaluate expressions
//! or trigger compilation.

use super::builtins;
use super::expr::{Expr, ExprParser, normalize};
use crate::{Error, ErrorAction, Kinds, Options, Result, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Body of a custom predicate.
pub type TestFn = dyn Fn(&Value) -> bool;

/// An atomic test.
#[derive(Clone)]
pub enum Test {
    /// Accepts values whose kind is in the set.
    Kinds(Kinds),
    Custom(Rc<TestFn>),
}

impl Test {
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Test::Kinds(kinds) => kinds.contains(value.kind()),
            Test::Custom(test) => test(value),
        }
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Kinds(kinds) => f.debug_tuple("Kinds").field(kinds).finish(),
            Test::Custom(_) => f.write_str("Custom(<function>)"),
        }
    }
}

/// What a name is bound to when it is defined.
#[derive(Debug, Clone)]
pub enum Definition {
    Test(Test),
    /// A type expression the name stands for.
    Alias(String),
}

impl Definition {
    pub fn test(test: impl Fn(&Value) -> bool + 'static) -> Self {
        Definition::Test(Test::Custom(Rc::new(test)))
    }

    pub fn alias(expression: impl Into<String>) -> Self {
        Definition::Alias(expression.into())
    }
}

impl From<&str> for Definition {
    fn from(expression: &str) -> Self {
        Definition::Alias(expression.to_string())
    }
}

impl From<String> for Definition {
    fn from(expression: String) -> Self {
        Definition::Alias(expression)
    }
}

impl From<Kinds> for Definition {
    fn from(kinds: Kinds) -> Self {
        Definition::Test(Test::Kinds(kinds))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Predicate {
    Atomic(Test),
    /// Source text of the aliased expression, compiled through the cache.
    Alias(String),
}

type ErrorHandler = Rc<dyn Fn(&Error) -> ErrorAction>;

/// Named predicates, their parsed expressions, and the hook that sees every
/// failure. Single-threaded; share it by reference.
pub struct Registry {
    options: Options,
    predicates: RefCell<HashMap<String, Rc<Predicate>>>,
    compiled: RefCell<HashMap<String, Rc<Expr>>>,
    error_handler: RefCell<ErrorHandler>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("options", &self.options)
            .field("predicates", &self.predicates.borrow().len())
            .field("compiled", &self.compiled.borrow().len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry with the built-in predicates installed.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let registry = Registry {
            options,
            predicates: RefCell::new(HashMap::new()),
            compiled: RefCell::new(HashMap::new()),
            error_handler: RefCell::new(Rc::new(default_error_handler)),
        };
        if registry.options.builtins {
            builtins::install(&registry);
        }
        registry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Bind `name`. Fails with `DuplicateType` if it is already bound.
    pub fn define(&self, name: &str, definition: impl Into<Definition>) -> Result<()> {
        self.bind(name, definition.into(), false)
    }

    /// Bind `name`, replacing any previous binding.
    pub fn redefine(&self, name: &str, definition: impl Into<Definition>) -> Result<()> {
        self.bind(name, definition.into(), true)
    }

    /// Shorthand for `define(name, Definition::test(test))`.
    pub fn define_test(&self, name: &str, test: impl Fn(&Value) -> bool + 'static) -> Result<()> {
        self.define(name, Definition::test(test))
    }

    fn bind(&self, name: &str, definition: Definition, override_existing: bool) -> Result<()> {
        if name.trim().is_empty() {
            return self.recover(Error::InvalidDefinition { name: name.to_string(), reason: "empty name".into() });
        }
        let fresh = !self.contains(name);
        if !override_existing && !fresh {
            return self.recover(Error::DuplicateType { name: name.to_string() });
        }

        let predicate = match definition {
            Definition::Test(test) => Predicate::Atomic(test),
            Definition::Alias(expression) => match self.resolvable_alias(name, &expression) {
                Ok(()) => Predicate::Alias(expression),
                Err(err) => return self.recover(err),
            },
        };
        self.install(name, predicate);
        if fresh && !regex!(r"^[[:word:]]+$").is_match(name) {
            self.compiled.borrow_mut().clear();
        }
        debug!(name, override_existing, "defined type");
        Ok(())
    }

    /// Check that `expression` can serve as the body of `name`: not blank, not
    /// pointing at itself and only naming types that already exist.
    fn resolvable_alias(&self, name: &str, expression: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidDefinition { name: name.to_string(), reason };

        if expression.trim().is_empty() {
            return Err(invalid("empty alias".into()));
        }

        let expr = self.compile(expression);
        for referenced in expr.names() {
            if referenced == name {
                return Err(invalid(format!("alias \"{expression}\" refers to itself")));
            }
            if !self.contains(referenced) {
                return Err(invalid(format!("\"{referenced}\" is not a defined type")));
            }
        }
        Ok(())
    }

    pub(crate) fn install(&self, name: &str, predicate: Predicate) {
        self.predicates.borrow_mut().insert(name.to_string(), Rc::new(predicate));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.borrow().contains_key(name)
    }

    /// Number of named predicates.
    pub fn len(&self) -> usize {
        self.predicates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cached source strings (raw and normalized forms count separately).
    pub fn cached_expressions(&self) -> usize {
        self.compiled.borrow().len()
    }

    /// Compile `source` into an expression tree, at most once per distinct text.
    pub fn compile(&self, source: &str) -> Rc<Expr> {
        if let Some(expr) = self.cached(source) {
            return expr;
        }
        if self.contains(source) {
            let expr = Rc::new(Expr::Named(source.to_string()));
            self.compiled.borrow_mut().insert(source.to_string(), Rc::clone(&expr));
            return expr;
        }

        let normalized = normalize(source);
        let expr = match self.cached(&normalized) {
            Some(expr) => expr,
            None => {
                let is_defined = |name: &str| self.contains(name);
                let expr = Rc::new(ExprParser::new(&is_defined).parse(&normalized));
                trace!(source, %expr, "compiled type expression");
                self.compiled.borrow_mut().insert(normalized, Rc::clone(&expr));
                expr
            }
        };
        self.compiled.borrow_mut().insert(source.to_string(), Rc::clone(&expr));
        expr
    }

    fn cached(&self, source: &str) -> Option<Rc<Expr>> {
        self.compiled.borrow().get(source).cloned()
    }

    /// Test `value` against a type expression.
    pub fn evaluate(&self, expression: &str, value: &Value) -> Result<bool> {
        let expr = self.compile(expression);
        self.evaluate_expr(&expr, value)
    }

    /// Test `value` against an already compiled expression.
    pub fn evaluate_expr(&self, expr: &Expr, value: &Value) -> Result<bool> {
        self.eval_at(expr, value, 0)
    }

    fn eval_at(&self, expr: &Expr, value: &Value, depth: usize) -> Result<bool> {
        match expr {
            Expr::Named(name) => {
                let Some(predicate) = self.lookup(name) else {
                    self.recover(Error::UnknownType { name: name.clone() })?;
                    return Ok(false);
                };
                match &*predicate {
                    Predicate::Atomic(test) => Ok(test.check(value)),
                    Predicate::Alias(source) => {
                        if depth >= self.options.max_alias_depth {
                            self.recover(Error::CyclicType { name: name.clone() })?;
                            return Ok(false);
                        }
                        let target = self.compile(source);
                        self.eval_at(&target, value, depth + 1)
                    }
                }
            }
            Expr::Or(left, right) => Ok(self.eval_at(left, value, depth)? || self.eval_at(right, value, depth)?),
            Expr::And(left, right) => Ok(self.eval_at(left, value, depth)? && self.eval_at(right, value, depth)?),
            Expr::Not(inner) => Ok(!self.eval_at(inner, value, depth)?),
            Expr::ArrayOf(inner) => {
                let Value::Array(items) = value else {
                    return Ok(false);
                };
                for item in items {
                    if !self.eval_at(inner, item, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Rc<Predicate>> {
        self.predicates.borrow().get(name).cloned()
    }

    /// Replace the hook that sees every failure raised through this registry.
    ///
    /// The hook answers [`ErrorAction::Recover`] to let recoverable failures
    /// fall back instead of returning `Err`.
    pub fn set_error_handler(&self, handler: impl Fn(&Error) -> ErrorAction + 'static) {
        *self.error_handler.borrow_mut() = Rc::new(handler);
    }

    fn consult(&self, err: &Error) -> ErrorAction {
        let handler = Rc::clone(&self.error_handler.borrow());
        handler(err)
    }

    /// Run the error hook on an error that is always raised and hand it back.
    pub(crate) fn report(&self, err: Error) -> Error {
        self.consult(&err);
        err
    }

    /// Run the error hook; `Ok(())` means the caller continues with its fallback.
    pub(crate) fn recover(&self, err: Error) -> Result<()> {
        match self.consult(&err) {
            ErrorAction::Recover if err.is_recoverable() => {
                debug!(error = %err, "recovered from failure");
                Ok(())
            }
            _ => Err(err),
        }
    }
}

fn default_error_handler(err: &Error) -> ErrorAction {
    debug!(error = %err, phase = ?err.phase(), "typex failure");
    ErrorAction::Raise
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn duplicate_definition_is_rejected_without_override() {
        let registry = Registry::new();
        registry.define_test("even", |v| v.as_f64().is_some_and(|n| n % 2.0 == 0.0)).unwrap();

        let err = registry.define_test("even", |_| true).unwrap_err();
        assert_eq!(err, Error::DuplicateType { name: "even".into() });
        assert!(!registry.evaluate("even", &Value::from(3)).unwrap());

        registry.redefine("even", Definition::test(|_| true)).unwrap();
        assert!(registry.evaluate("even", &Value::from(3)).unwrap());
    }

    #[test]
    fn aliases_must_resolve_when_defined() {
        let registry = Registry::new();

        let missing = registry.define("widget", "gadget or string").unwrap_err();
        assert!(matches!(missing, Error::InvalidDefinition { ref name, .. } if name == "widget"));

        let blank = registry.define("blank", "   ").unwrap_err();
        assert!(matches!(blank, Error::InvalidDefinition { .. }));

        let looped = registry.define("loop", "loop or string").unwrap_err();
        assert!(matches!(looped, Error::InvalidDefinition { .. }));

        registry.define("label", "string or number").unwrap();
        assert!(registry.evaluate("label", &Value::from(4)).unwrap());
        assert!(!registry.evaluate("label", &Value::Null).unwrap());
    }

    #[test]
    fn kinds_definitions_accept_any_listed_kind() {
        let registry = Registry::new();
        registry.define("scalar", Kinds::STRING | Kinds::NUMBER | Kinds::BOOLEAN).unwrap();

        assert!(registry.evaluate("scalar", &Value::from(false)).unwrap());
        assert!(!registry.evaluate("scalar", &Value::array([1])).unwrap());
    }

    #[test]
    fn unknown_names_fail_at_evaluation() {
        let registry = Registry::new();
        let err = registry.evaluate("string or gizmo", &Value::from(1)).unwrap_err();

        assert_eq!(err, Error::UnknownType { name: "gizmo".into() });
        // Short-circuiting never reaches the unknown name.
        assert!(registry.evaluate("string or gizmo", &Value::from("s")).unwrap());
    }

    #[test]
    fn alias_cycles_through_redefinition_are_bounded() {
        let registry = Registry::with_options(Options { max_alias_depth: 8, ..Options::default() });
        registry.define("a", "string").unwrap();
        registry.define("b", "a").unwrap();
        registry.redefine("a", "b").unwrap();

        let err = registry.evaluate("a", &Value::from(1)).unwrap_err();
        assert!(matches!(err, Error::CyclicType { .. }));
    }

    #[test]
    fn repeated_evaluation_hits_the_cache() {
        let registry = Registry::new();
        let value = Value::array(vec![Value::Null, Value::from(5)]);

        assert!(registry.evaluate("((not set) or number) array", &value).unwrap());
        let names = registry.len();
        let cached = registry.cached_expressions();

        assert!(registry.evaluate("((not set) or number) array", &value).unwrap());
        assert_eq!(registry.len(), names);
        assert_eq!(registry.cached_expressions(), cached);
    }

    #[test]
    fn raw_and_normalized_sources_are_separate_keys() {
        let registry = Registry::with_options(Options { builtins: false, ..Options::default() });
        assert!(registry.is_empty());

        let first = registry.compile("a || b");
        assert_eq!(registry.cached_expressions(), 2);

        let second = registry.compile("a or b");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_expressions(), 2);
    }

    #[test]
    fn custom_tests_may_reenter_the_registry() {
        let registry = Rc::new(Registry::new());
        let inner = Rc::clone(&registry);
        registry
            .define_test("logger", move |v| {
                v.get("log").is_some_and(|log| inner.evaluate("function", log).unwrap_or(false))
            })
            .unwrap();

        let console = Value::object([("log", Value::function("log", |_| Value::Undefined))]);
        assert!(registry.evaluate("logger", &console).unwrap());
        assert!(!registry.evaluate("logger", &Value::object([("log", 1)])).unwrap());
    }

    #[test]
    fn error_handler_sees_every_failure() {
        let registry = Registry::new();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        registry.set_error_handler(move |_| {
            counter.set(counter.get() + 1);
            ErrorAction::Raise
        });

        let _ = registry.evaluate("nothing", &Value::Null);
        let _ = registry.define("string", "number");
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn recovering_hook_lets_evaluation_fall_back() {
        let registry = Registry::with_options(Options { max_alias_depth: 4, ..Options::default() });
        registry.set_error_handler(|_| ErrorAction::Recover);
        registry.define("a", "string").unwrap();
        registry.define("b", "a").unwrap();
        registry.redefine("a", "b").unwrap();

        let cases = vec![
            (true, "gizmo or string", Value::from("s")),
            (false, "gizmo", Value::from("s")),
            (true, "not gizmo", Value::Null),
            (false, "a", Value::from("s")),
        ];
        for (expected, expression, value) in cases {
            assert_eq!(registry.evaluate(expression, &value).unwrap(), expected, "{expression} on {value}");
        }
    }

    #[test]
    fn recovered_definitions_bind_nothing() {
        let registry = Registry::new();
        registry.set_error_handler(|_| ErrorAction::Recover);

        assert!(registry.define("string", "number").is_ok());
        assert!(registry.evaluate("string", &Value::from("s")).unwrap());
        assert!(registry.define("widget", "gadget").is_ok());
        assert!(!registry.contains("widget"));
    }

    #[test]
    fn names_defined_after_caching_win_over_splitting() {
        let registry = Registry::new();
        registry.define("a", "string").unwrap();
        registry.define("b", "number").unwrap();

        assert!(!registry.evaluate("a or b", &Value::Null).unwrap());
        assert!(!registry.evaluate("(a or b) and not string", &Value::Null).unwrap());

        registry.define_test("a or b", |_| true).unwrap();
        assert!(registry.evaluate("a or b", &Value::Null).unwrap());
        assert!(registry.evaluate("(a or b) and not string", &Value::Null).unwrap());
    }

    #[test]
    fn raw_source_naming_a_type_is_not_split() {
        let registry = Registry::new();
        registry.define_test("x || y", |v| v.is_unset()).unwrap();

        assert!(registry.evaluate("x || y", &Value::Null).unwrap());
        assert!(registry.evaluate("(x || y)[]", &Value::array(vec![Value::Null])).is_err());
    }

    #[test]
    fn aliases_follow_names_defined_later() {
        let registry = Registry::new();
        registry.define("a", "string").unwrap();
        registry.define("b", "number").unwrap();
        registry.define("either", "a or b").unwrap();

        registry.define_test("a or b", |v| v.is_unset()).unwrap();
        assert!(registry.evaluate("either", &Value::Null).unwrap());
        assert!(!registry.evaluate("either", &Value::from("s")).unwrap());
    }
}
