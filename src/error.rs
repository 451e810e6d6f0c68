//! Error kinds raised by the registry, the expression compiler and the
//! dispatch engine.
//!
//! Every error knows the [`Phase`] it belongs to, so callers can tell a
//! malformed dispatcher (construction) apart from a call that simply found no
//! matching route.

use thiserror::Error;

/// When an error can be raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// While adding a predicate to a registry.
    Definition,
    /// While building or extending a dispatcher.
    Construction,
    /// While evaluating an expression or dispatching a call.
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("No type named \"{name}\" has been defined.")]
    UnknownType { name: String },

    #[error("A type called \"{name}\" already exists.")]
    DuplicateType { name: String },

    #[error("Type definition for \"{name}\" requires a test function or a resolvable alias ({reason}).")]
    InvalidDefinition { name: String, reason: String },

    /// An alias chain nested deeper than `Options::max_alias_depth`.
    #[error("Type \"{name}\" is defined in terms of itself.")]
    CyclicType { name: String },

    #[error("Improper rule descriptor: {descriptor}")]
    InvalidRuleDescriptor { descriptor: String },

    #[error("Improper route descriptor at position {position}: {reason}")]
    InvalidRouteDescriptor { position: usize, reason: String },

    #[error("Arguments ({arguments}) do not conform to any of {routes} overload(s).")]
    NoMatchingRoute { arguments: String, routes: usize },

    #[error("Overload {ordinal} has no previously registered behavior.")]
    NoPreviousRoute { ordinal: usize },

    /// Raised by behavior code through [`Error::behavior`].
    #[error("{message}")]
    Behavior { message: String },
}

impl Error {
    /// Convenience constructor for failures raised inside a behavior.
    pub fn behavior(message: impl Into<String>) -> Self {
        Error::Behavior { message: message.into() }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Error::DuplicateType { .. } | Error::InvalidDefinition { .. } => Phase::Definition,
            Error::InvalidRuleDescriptor { .. } | Error::InvalidRouteDescriptor { .. } => Phase::Construction,
            Error::UnknownType { .. }
            | Error::CyclicType { .. }
            | Error::NoMatchingRoute { .. }
            | Error::NoPreviousRoute { .. }
            | Error::Behavior { .. } => Phase::Call,
        }
    }

    /// Whether an error hook may turn this error into a fallback result.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnknownType { .. }
                | Error::CyclicType { .. }
                | Error::NoMatchingRoute { .. }
                | Error::DuplicateType { .. }
                | Error::InvalidDefinition { .. }
        )
    }
}

/// Verdict of an error hook.
///
/// `Recover` lets the failing operation continue with a fallback:
///
/// ```text
/// UnknownType, CyclicType           the name tests false
/// NoMatchingRoute                   the call returns undefined
/// DuplicateType, InvalidDefinition  nothing is bound
/// ```
///
/// Every other error is raised whatever the hook answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorAction {
    Raise,
    Recover,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
