use crate::engine::{Definition, Dispatcher, Registry, RouteItem};
use crate::{Error, ErrorAction, Result, Value};

thread_local! {
    static DEFAULT_REGISTRY: &'static Registry = Box::leak(Box::new(Registry::new()));
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Install the built-in predicates (`string`, `int`, `set`, ...).
    pub builtins: bool,
    /// How many alias hops an evaluation may take before failing with
    /// [`Error::CyclicType`].
    pub max_alias_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { builtins: true, max_alias_depth: 64 }
    }
}

/// The calling thread's default registry, created on first use.
pub fn registry() -> &'static Registry {
    DEFAULT_REGISTRY.with(|registry| *registry)
}

/// Define `name` in the default registry.
///
/// # Example
/// ```
/// use typex::{Value, define, evaluate};
///
/// define("port", "int").unwrap();
/// assert!(evaluate("port", &Value::from(8080)).unwrap());
/// assert!(define("port", "string").is_err());
/// ```
pub fn define(name: &str, definition: impl Into<Definition>) -> Result<()> {
    registry().define(name, definition)
}

pub fn redefine(name: &str, definition: impl Into<Definition>) -> Result<()> {
    registry().redefine(name, definition)
}

/// Test `value` against `expression` in the default registry.
pub fn evaluate(expression: &str, value: &Value) -> Result<bool> {
    registry().evaluate(expression, value)
}

/// Name of the built-in type `value` belongs to.
///
/// ```
/// use typex::{Value, type_of};
///
/// assert_eq!(type_of(&Value::array([1, 2])), "array");
/// assert_eq!(type_of(&Value::Null), "null");
/// ```
pub fn type_of(value: &Value) -> &'static str {
    value.type_name()
}

/// Build a dispatcher over the default registry.
pub fn create_dispatcher<S>(items: impl IntoIterator<Item = RouteItem<S>>) -> Result<Dispatcher<'static, S>> {
    Dispatcher::new(registry(), items)
}

/// Replace the default registry's error hook.
pub fn set_error_handler(handler: impl Fn(&Error) -> ErrorAction + 'static) {
    registry().set_error_handler(handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn default_registry_is_shared_per_thread() {
        define("api-shared", "string or null").unwrap();
        assert!(registry().contains("api-shared"));
        assert!(evaluate("api-shared", &Value::Null).unwrap());

        let other = std::thread::spawn(|| registry().contains("api-shared")).join().unwrap();
        assert!(!other);
    }

    #[test]
    fn redefine_replaces_in_default_registry() {
        define("api-flag", "boolean").unwrap();
        redefine("api-flag", "boolean or numeric").unwrap();
        assert!(evaluate("api-flag", &Value::from("1")).unwrap());
    }

    #[test]
    fn create_dispatcher_uses_default_registry() {
        define("api-even", Definition::test(|v| v.as_f64().is_some_and(|n| n % 2.0 == 0.0))).unwrap();
        let parity = create_dispatcher::<()>(vec![
            RouteItem::rules(["api-even"]),
            RouteItem::behavior(|_, _| Ok(Value::from("even"))),
            RouteItem::rules(["int"]),
            RouteItem::behavior(|_, _| Ok(Value::from("odd"))),
        ])
        .unwrap();

        assert_eq!(parity.call(vec![Value::from(4)]).unwrap(), Value::from("even"));
        assert_eq!(parity.call(vec![Value::from(7)]).unwrap(), Value::from("odd"));
    }

    #[test]
    fn global_error_handler_observes_failures() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        set_error_handler(move |err| {
            sink.borrow_mut().push(err.phase());
            ErrorAction::Raise
        });

        assert!(create_dispatcher::<()>(vec![RouteItem::rules(["any"])]).is_err());
        assert!(evaluate("api-missing", &Value::Null).is_err());
        assert_eq!(*seen.borrow(), vec![crate::Phase::Construction, crate::Phase::Call]);
    }

    #[test]
    fn recovering_global_hook_degrades_gracefully() {
        let fallback = std::thread::spawn(|| {
            set_error_handler(|_| ErrorAction::Recover);
            let table = create_dispatcher::<()>(vec![
                RouteItem::rules(["string"]),
                RouteItem::behavior(|_, _| Ok(Value::from("text"))),
            ])
            .unwrap();

            let unknown = evaluate("api-gizmo or string", &Value::from("s")).unwrap();
            (unknown, table.call(vec![Value::Null]).unwrap() == Value::Undefined)
        })
        .join()
        .unwrap();

        assert_eq!(fallback, (true, true), "unknown names test false and a missed call returns undefined");
    }

    #[test]
    fn type_of_names_builtin_types() {
        assert_eq!(type_of(&Value::from("x")), "string");
        assert!(evaluate(type_of(&Value::from(1)), &Value::from(7)).unwrap());
    }

    #[test]
    fn options_default_to_builtins() {
        let options = Options::default();
        assert!(options.builtins);
        assert_eq!(options.max_alias_depth, 64);
        assert!(Registry::with_options(Options { builtins: false, ..options }).is_empty());
    }
}
