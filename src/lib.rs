//! Type-predicate expressions and multiple dispatch over dynamic values.
//!
//! Predicates are named tests on [`Value`]s, combined by a small expression
//! language (`or`, `and`, `not`, `array`, parentheses):
//!
//! ```
//! use typex::{Registry, Value};
//!
//! let registry = Registry::new();
//! assert!(registry.evaluate("((not set) or number) array", &Value::array(vec![Value::Null, Value::from(5)])).unwrap());
//! assert!(!registry.evaluate("string || int", &Value::from(2.5)).unwrap());
//! ```
//!
//! A [`Dispatcher`] selects among overloads by testing each argument against
//! a per-position rule, filling defaults along the way:
//!
//! ```
//! use typex::{Dispatcher, Registry, Value, rules};
//!
//! let registry = Registry::new();
//! let greet: Dispatcher = Dispatcher::builder(&registry)
//!     .route(rules!["string", ["int", 1]], |_, args| {
//!         let times = args[1].as_f64().unwrap_or(1.0) as usize;
//!         Ok(Value::from(args[0].as_str().unwrap_or_default().repeat(times)))
//!     })
//!     .build()?;
//!
//! assert_eq!(greet.call(vec![Value::from("hi")])?, Value::from("hi"));
//! assert_eq!(greet.call(vec![Value::from("hi"), Value::from(2)])?, Value::from("hihi"));
//! # Ok::<(), typex::Error>(())
//! ```

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod value;

pub use api::{Options, create_dispatcher, define, evaluate, redefine, registry, set_error_handler, type_of};
pub use engine::{
    Behavior, Call, Definition, Dispatcher, DispatcherBuilder, Expr, Match, Registry, Route, RouteItem, Rule,
    RuleDescriptor, Test, TestFn, normalize,
};
pub use error::{Error, ErrorAction, Phase, Result};
pub use value::{Function, Kinds, NativeFn, Value};
