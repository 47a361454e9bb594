//! Error types for store operations.

use thiserror::Error;

/// Which mandatory probe a slice reducer failed during combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeProbe {
    /// The bootstrap action with no previous state
    Init,
    /// A random unknown action type with no previous state
    UnknownAction,
}

/// Main error type for store operations.
///
/// Every variant is raised synchronously to the caller of the offending
/// operation. Errors are `Clone` so the reducer combinator can re-raise a
/// captured shape violation on every call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Actions must be plain data records: {0}. Use custom middleware for async actions.")]
    InvalidAction(String),

    #[error("Actions may not have an undefined \"type\" property. Have you misspelled a constant?")]
    MissingActionType,

    #[error("Reducers may not dispatch actions.")]
    Reentrancy,

    #[error(
        "Given action \"{action_type}\", reducer \"{key}\" returned undefined. \
         To ignore an action, you must explicitly return the previous state."
    )]
    UndefinedSliceState { key: String, action_type: String },

    #[error("{}", shape_violation_message(.key, .probe))]
    ReducerShapeViolation { key: String, probe: ShapeProbe },

    #[error("Given action \"{action_type}\", the root reducer returned undefined.")]
    UndefinedState { action_type: String },

    #[error("State for slice \"{key}\" is not a {expected}")]
    SliceTypeMismatch { key: String, expected: &'static str },

    #[error("The store behind this handle has been dropped")]
    Detached,
}

fn shape_violation_message(key: &str, probe: &ShapeProbe) -> String {
    match probe {
        ShapeProbe::Init => format!(
            "Reducer \"{key}\" returned undefined during initialization. \
             If the state passed to the reducer is undefined, you must explicitly \
             return the initial state."
        ),
        ShapeProbe::UnknownAction => format!(
            "Reducer \"{key}\" returned undefined when probed with a random type. \
             Don't try to handle {} or other actions in the \"@@reduct/\" namespace. \
             They are considered private. You must return the current state for any \
             unknown action, or the initial state when the current state is undefined.",
            crate::action::action_types::INIT
        ),
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
