//! Action trait, reserved action types and the reducer-facing envelope

use std::fmt::Debug;

use crate::error::StoreError;

/// Reserved action types used by the store itself.
///
/// Reducers must never treat these as application logic: on seeing one (or
/// any type they do not recognize) they return their current state, or
/// their initial state when there is none yet.
pub mod action_types {
    /// Dispatched once when a store is created and again on every
    /// [`Store::replace_reducer`](crate::Store::replace_reducer).
    pub const INIT: &str = "@@reduct/INIT";

    /// Prefix of the random action types used to probe slice reducers.
    pub const PROBE_UNKNOWN_ACTION_PREFIX: &str = "@@reduct/PROBE_UNKNOWN_ACTION_";

    /// Whether `action_type` lives in the store's private namespace.
    pub fn is_reserved(action_type: &str) -> bool {
        action_type.starts_with("@@reduct/")
    }
}

/// Trait for actions that can be dispatched to the store
///
/// Actions describe an intended state transition. They should be:
/// - Clone: Actions may be logged, replayed, or recorded by middleware
/// - Debug: For debugging and logging
///
/// Use `#[derive(Action)]` from `reduct-macros` to implement this trait for
/// enums.
pub trait Action: Clone + Debug + 'static {
    /// The action's type discriminant, used for logging and error messages
    fn name(&self) -> &str;

    /// Check that the action is a well-formed record before it reaches a
    /// reducer.
    ///
    /// Typed actions are well-formed by construction. Dynamic actions such
    /// as [`JsonAction`](crate::JsonAction) override this to report
    /// [`StoreError::InvalidAction`] or [`StoreError::MissingActionType`].
    fn validate(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Human-readable one-line summary of an action, used by the action log.
///
/// The default implementation uses the `Debug` representation.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

/// What a reducer receives on every call.
///
/// Besides application actions the store sends its own bootstrap action
/// ([`Envelope::Init`]), and the reducer combinator probes slice reducers
/// with a random, never-matching type ([`Envelope::Probe`]).
#[derive(Debug)]
pub enum Envelope<'a, A> {
    /// The bootstrap action, [`action_types::INIT`]
    Init,
    /// A shape probe carrying a freshly generated unknown type
    Probe(&'a str),
    /// An application action
    Action(&'a A),
}

impl<A> Clone for Envelope<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Envelope<'_, A> {}

impl<'a, A: Action> Envelope<'a, A> {
    /// The type discriminant of the enveloped action.
    pub fn action_type(&self) -> &'a str {
        match *self {
            Envelope::Init => action_types::INIT,
            Envelope::Probe(action_type) => action_type,
            Envelope::Action(action) => action.name(),
        }
    }
}

impl<'a, A> Envelope<'a, A> {
    /// The application action, if this is not a reserved one.
    pub fn action(&self) -> Option<&'a A> {
        match *self {
            Envelope::Action(action) => Some(action),
            _ => None,
        }
    }

    /// Returns true for the bootstrap action.
    pub fn is_init(&self) -> bool {
        matches!(self, Envelope::Init)
    }
}
