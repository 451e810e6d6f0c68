//! Type predicates and multiple dispatch.
//!
//! This module is the *public entry point* for the engine. It is split into
//! focused submodules under `src/engine/` while keeping public paths flat
//! (for example `crate::engine::Registry` and `crate::engine::Dispatcher`).
//!
//! ## How the parts work together
//!
//! ```text
//! "string or int"  ── normalize + ExprParser ──▶ Expr   (expr.rs)
//!                                                 │
//!                              Registry::compile  │ cached per source text
//!                                                 ▼
//!                     Registry::evaluate(expr, value) -> bool   (registry.rs)
//!                       - Named   ─▶ predicate lookup (Test or Alias)
//!                       - Or/And/Not/ArrayOf ─▶ recursion
//!                                                 │
//! RuleDescriptor ── Rule::new ──▶ Rule ───────────┤ scalar or shape   (rule.rs)
//!                                                 │
//! [rules, behavior, ...] ── Dispatcher::new ──▶ Vec<Route>   (dispatcher.rs)
//!                                                 │
//! dispatch(scope, args)                           ▼
//!   for each Route in order: Route::test(args)    (route.rs)
//!     - match every rule, rewrite args (defaults, shape merges)
//!     - first success runs the behavior with a Call handle
//! ```
//!
//! ## Responsibilities by module
//!
//! - `expr.rs`: normalization and the first-match parser producing [`Expr`].
//! - `registry.rs`: the predicate namespace, the compile cache, evaluation and
//!   the error hook.
//! - `builtins.rs`: the predicates every default registry starts with.
//! - `rule.rs`: per-argument matchers built from [`RuleDescriptor`]s.
//! - `route.rs`: a rule list plus its behavior.
//! - `dispatcher.rs`: ordered routes, the [`Call`] handle and the builder.
//!
//! ## Debugging
//!
//! Compilation and route selection emit `tracing` events at `trace` and
//! `debug` level.

#[path = "engine/builtins.rs"]
mod builtins;
#[path = "engine/dispatcher.rs"]
mod dispatcher;
#[path = "engine/expr.rs"]
mod expr;
#[path = "engine/registry.rs"]
mod registry;
#[path = "engine/route.rs"]
mod route;
#[path = "engine/rule.rs"]
mod rule;


pub use dispatcher::{Behavior, Call, Dispatcher, DispatcherBuilder, RouteItem};
pub use expr::{Expr, normalize};
pub use registry::{Definition, Registry, Test, TestFn};
pub use route::Route;
pub use rule::{Match, Rule, RuleDescriptor};
