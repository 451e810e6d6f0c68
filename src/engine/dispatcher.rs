//! Ordered overload tables.
//!
//! A dispatcher is built from an alternating item sequence:
//!
//! ```text
//! position  0        1          2        3
//!           rules -> behavior,  rules -> behavior, ...
//! ```
//!
//! Routes are tried in registration order and the first whose rules match
//! runs. Behaviors receive a [`Call`] handle that knows which route is running
//! and can reach the other behaviors by ordinal.

use super::registry::Registry;
use super::route::Route;
use super::rule::{Rule, RuleDescriptor};
use crate::{Error, Result, Value};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Body of a route. Receives the call handle and the rewritten arguments.
pub type Behavior<S> = Rc<dyn Fn(&Call<'_, '_, S>, Vec<Value>) -> Result<Value>>;

pub(crate) fn behavior<S>(body: impl Fn(&Call<'_, '_, S>, Vec<Value>) -> Result<Value> + 'static) -> Behavior<S> {
    Rc::new(body)
}

/// One element of the alternating construction sequence.
pub enum RouteItem<S = ()> {
    Rules(Vec<RuleDescriptor>),
    Behavior(Behavior<S>),
}

impl<S> RouteItem<S> {
    pub fn rules<D: Into<RuleDescriptor>>(descriptors: impl IntoIterator<Item = D>) -> Self {
        RouteItem::Rules(descriptors.into_iter().map(Into::into).collect())
    }

    pub fn behavior(body: impl Fn(&Call<'_, '_, S>, Vec<Value>) -> Result<Value> + 'static) -> Self {
        RouteItem::Behavior(behavior(body))
    }
}

impl<S> fmt::Debug for RouteItem<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteItem::Rules(descriptors) => f.debug_tuple("Rules").field(descriptors).finish(),
            RouteItem::Behavior(_) => f.write_str("Behavior(<function>)"),
        }
    }
}

/// An ordered overload table over a borrowed [`Registry`].
///
/// `S` is the scope every behavior receives through [`Call::scope`].
pub struct Dispatcher<'r, S = ()> {
    registry: &'r Registry,
    routes: Vec<Route<S>>,
}

impl<'r, S> Dispatcher<'r, S> {
    pub fn new(registry: &'r Registry, items: impl IntoIterator<Item = RouteItem<S>>) -> Result<Self> {
        let mut dispatcher = Dispatcher { registry, routes: Vec::new() };
        dispatcher.extend(items)?;
        Ok(dispatcher)
    }

    pub fn builder(registry: &'r Registry) -> DispatcherBuilder<'r, S> {
        DispatcherBuilder { registry, items: Vec::new() }
    }

    /// Append routes after the existing ones.
    ///
    /// The whole sequence is validated before anything is appended, so a
    /// failed extend leaves the dispatcher as it was.
    pub fn extend(&mut self, items: impl IntoIterator<Item = RouteItem<S>>) -> Result<&mut Self> {
        let mut routes = Vec::new();
        let mut pending: Option<(usize, Vec<Rule>)> = None;

        for (position, item) in items.into_iter().enumerate() {
            match (item, pending.take()) {
                (RouteItem::Rules(descriptors), None) => {
                    let rules = descriptors
                        .iter()
                        .map(|descriptor| Rule::new(self.registry, descriptor))
                        .collect::<Result<Vec<_>>>()?;
                    pending = Some((position, rules));
                }
                (RouteItem::Behavior(behavior), Some((_, rules))) => routes.push(Route::new(rules, behavior)),
                (RouteItem::Rules(_), Some(_)) => {
                    return Err(self.misplaced(position, "expected a behavior, found a rule list"));
                }
                (RouteItem::Behavior(_), None) => {
                    return Err(self.misplaced(position, "expected a rule list, found a behavior"));
                }
            }
        }
        if let Some((position, _)) = pending {
            return Err(self.misplaced(position, "rule list has no behavior"));
        }

        debug!(added = routes.len(), total = self.routes.len() + routes.len(), "extended dispatcher");
        self.routes.extend(routes);
        Ok(self)
    }

    fn misplaced(&self, position: usize, reason: &str) -> Error {
        self.registry.report(Error::InvalidRouteDescriptor { position, reason: reason.to_string() })
    }

    /// Run the first route whose rules accept `args`.
    ///
    /// With no match the call fails with `NoMatchingRoute`, or returns
    /// `undefined` when the registry's error hook recovers.
    pub fn dispatch(&self, scope: &S, mut args: Vec<Value>) -> Result<Value> {
        for (ordinal, route) in self.routes.iter().enumerate() {
            let matched = route.test(self.registry, &mut args)?;
            trace!(ordinal, matched, %route, "tested route");
            if matched {
                debug!(ordinal, %route, "dispatching");
                return route.run(&Call { dispatcher: self, scope, ordinal }, args);
            }
        }

        let arguments = args.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        self.registry.recover(Error::NoMatchingRoute { arguments, routes: self.routes.len() })?;
        Ok(Value::Undefined)
    }

    /// Run the behavior of route `ordinal` directly, without testing its rules.
    pub fn invoke(&self, ordinal: usize, scope: &S, args: Vec<Value>) -> Result<Value> {
        let Some(route) = self.routes.get(ordinal) else {
            return Err(self.registry.report(Error::NoPreviousRoute { ordinal }));
        };
        route.run(&Call { dispatcher: self, scope, ordinal }, args)
    }

    pub fn routes(&self) -> &[Route<S>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }
}

impl Dispatcher<'_, ()> {
    /// Dispatch without a scope.
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        self.dispatch(&(), args)
    }
}

impl<S> fmt::Display for Dispatcher<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ordinal, route) in self.routes.iter().enumerate() {
            writeln!(f, "#{ordinal} {route}")?;
        }
        Ok(())
    }
}

impl<S> fmt::Debug for Dispatcher<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("routes", &self.routes).finish_non_exhaustive()
    }
}

/// Handle passed to a running behavior.
pub struct Call<'d, 'r, S> {
    dispatcher: &'d Dispatcher<'r, S>,
    scope: &'d S,
    ordinal: usize,
}

impl<'r, S> Call<'_, 'r, S> {
    pub fn scope(&self) -> &S {
        self.scope
    }

    /// Position of the running route in registration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Run the first registered behavior with the same scope.
    pub fn first(&self, args: Vec<Value>) -> Result<Value> {
        self.dispatcher.invoke(0, self.scope, args)
    }

    /// Run the behavior registered just before this one.
    pub fn previous(&self, args: Vec<Value>) -> Result<Value> {
        match self.ordinal.checked_sub(1) {
            Some(ordinal) => self.dispatcher.invoke(ordinal, self.scope, args),
            None => Err(self.dispatcher.registry.report(Error::NoPreviousRoute { ordinal: self.ordinal })),
        }
    }

    /// Re-enter the whole dispatcher.
    pub fn dispatch(&self, args: Vec<Value>) -> Result<Value> {
        self.dispatcher.dispatch(self.scope, args)
    }

    pub fn registry(&self) -> &'r Registry {
        self.dispatcher.registry
    }
}

/// Typed construction that always alternates rules and behaviors.
pub struct DispatcherBuilder<'r, S = ()> {
    registry: &'r Registry,
    items: Vec<RouteItem<S>>,
}

impl<'r, S> DispatcherBuilder<'r, S> {
    pub fn route(
        mut self,
        rules: Vec<RuleDescriptor>,
        body: impl Fn(&Call<'_, '_, S>, Vec<Value>) -> Result<Value> + 'static,
    ) -> Self {
        self.items.push(RouteItem::Rules(rules));
        self.items.push(RouteItem::behavior(body));
        self
    }

    pub fn build(self) -> Result<Dispatcher<'r, S>> {
        Dispatcher::new(self.registry, self.items)
    }
}
