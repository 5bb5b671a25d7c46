//! Error taxonomy for the binding graph.
//!
//! Two families share this enum:
//!
//! - **Usage errors** — programmer mistakes (wrong call context, duplicate
//!   registration, malformed bindings). Surfaced immediately; callers are
//!   expected to treat them as fatal during development.
//! - **Stale-reference conditions** — operating on a handle whose owning
//!   object is gone. These are ordinary runtime outcomes: lookups report
//!   [`BindingError::UnknownInstance`] and callers branch to a safe default
//!   ("treat as unbound") instead of crashing.

use core::fmt;

/// Errors produced by the binding service and typed property storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// An operation was invoked from a call context that forbids it
    /// (e.g. mutating the graph in the middle of a resolve pass).
    UsageError(&'static str),
    /// The handle does not designate a live registered instance.
    UnknownInstance,
    /// The instance exists but is dead or scheduled for destruction.
    DeadInstance(&'static str),
    /// The requested binding would create a dependency cycle.
    CyclicBinding,
    /// Source and target value types disagree and no converter bridges them.
    IncompatibleTypes {
        expected: &'static str,
        found: &'static str,
    },
    /// The instance kinds involved cannot be bound this way.
    IncompatibleProperties(&'static str),
    /// The binding shape itself is unsupported (source count, converter
    /// arity, mode/converter combination).
    Unsupported(&'static str),
    /// A read-only property cannot participate as a two-way binding source.
    TwoWayReadOnlySource,
    /// The one-way/two-way layering rules were violated.
    TwoWaySourceRule(&'static str),
    /// A property definition does not belong to the storage it was used with.
    DefinitionMismatch,
    /// An internal invariant was violated; this should not occur.
    Internal(&'static str),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsageError(msg) => write!(f, "usage error: {msg}"),
            Self::UnknownInstance => write!(f, "unknown property instance"),
            Self::DeadInstance(what) => write!(f, "{what} must be alive"),
            Self::CyclicBinding => write!(f, "circular dependency found"),
            Self::IncompatibleTypes { expected, found } => write!(
                f,
                "incompatible types: expected '{expected}', found '{found}' \
                 (supply a converter or a multi converter binding)"
            ),
            Self::IncompatibleProperties(msg) => write!(f, "incompatible properties: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported binding: {msg}"),
            Self::TwoWayReadOnlySource => {
                write!(f, "a read-only property can not participate in two way binding")
            }
            Self::TwoWaySourceRule(msg) => write!(f, "{msg}"),
            Self::DefinitionMismatch => write!(
                f,
                "the dependency property definition does not match this property storage"
            ),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for BindingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_informative() {
        let err = BindingError::IncompatibleTypes {
            expected: "u32",
            found: "f32",
        };
        let text = err.to_string();
        assert!(text.contains("u32"));
        assert!(text.contains("f32"));
    }

    #[test]
    fn error_trait_object() {
        let err: Box<dyn std::error::Error> = Box::new(BindingError::UnknownInstance);
        assert_eq!(err.to_string(), "unknown property instance");
    }
}
