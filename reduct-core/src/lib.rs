//! Core traits and types for reduct
//!
//! This crate provides a single-store state container in the Redux mould:
//! state lives in one place, changes only by dispatching actions through a
//! reducer, and cross-cutting behavior is layered on with middleware.
//!
//! # Core Concepts
//!
//! - **Action**: Records that describe state changes
//! - **Reducer**: Pure function from previous state and action to next state
//! - **Store**: Holds the state, runs the reducer and notifies listeners
//! - **Middleware**: Wraps dispatch for logging, thunks and other effects
//! - **combine_reducers**: Builds one reducer out of per-key slice reducers
//!
//! # Basic Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use reduct_core::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! fn counter(state: Option<Rc<i32>>, action: Envelope<'_, CounterAction>) -> Option<Rc<i32>> {
//!     let state = state.unwrap_or_else(|| Rc::new(0));
//!     match action {
//!         Envelope::Action(CounterAction::Increment) => Some(Rc::new(*state + 1)),
//!         Envelope::Action(CounterAction::Decrement) => Some(Rc::new(*state - 1)),
//!         _ => Some(state),
//!     }
//! }
//!
//! let store = Store::new(counter)?;
//! store.subscribe(|| println!("changed"));
//! store.dispatch(CounterAction::Increment)?;
//! assert_eq!(*store.state(), 1);
//! ```
//!
//! # Combining Reducers
//!
//! ```ignore
//! let root = combine_reducers(
//!     ReducerMap::new()
//!         .slice("todos", todos)
//!         .slice("filter", visibility_filter),
//! );
//! let store = Store::builder(root)
//!     .enhancer(apply_middleware(vec![Box::new(ThunkMiddleware)]))
//!     .build()?;
//!
//! let todos: Option<Rc<Vec<Todo>>> = store.state().slice("todos");
//! ```
//!
//! Unchanged slices keep their `Rc` identity, and when no slice changes the
//! combined state itself is returned as-is, so `Rc::ptr_eq` is a complete
//! change check.

pub mod action;
pub mod combine;
pub mod compose;
pub mod debug;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
pub mod middleware;
pub mod reducer;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::{action_types, Action, ActionSummary, Envelope};
pub use error::{Result, ShapeProbe, StoreError};
pub use reducer::{with_initial, Reduced, Reducer, SharedReducer, WithInitial};

#[cfg(feature = "json")]
pub use json::JsonAction;

// Store exports
pub use store::{
    create_store, Enhancer, Observable, Observer, Store, StoreBuilder, StoreCreator,
    Subscription, WeakStore,
};

// Middleware exports
pub use middleware::{
    apply_middleware, middleware_fn, DispatchFn, DispatchResult, FnMiddleware, Intent, Link,
    LoggingMiddleware, Middleware, MiddlewareApi, Thunk, ThunkMiddleware,
};

// Combinator exports
pub use combine::{
    combine_reducers, combine_reducers_with, CombineConfig, CombinedReducer, CombinedState,
    ReducerMap,
};
pub use compose::{compose, BoxedFn};

// Testing exports
pub use testing::{ActionRecorder, StoreHarness};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionSummary, Envelope};
    pub use crate::combine::{
        combine_reducers, combine_reducers_with, CombineConfig, CombinedReducer, CombinedState,
        ReducerMap,
    };
    pub use crate::compose::compose;
    pub use crate::debug::{ActionFilter, ActionLoggerMiddleware};
    pub use crate::error::StoreError;
    #[cfg(feature = "json")]
    pub use crate::json::JsonAction;
    pub use crate::middleware::{
        apply_middleware, middleware_fn, DispatchFn, DispatchResult, Intent, LoggingMiddleware,
        Middleware, MiddlewareApi, ThunkMiddleware,
    };
    pub use crate::reducer::{with_initial, Reducer};
    pub use crate::store::{Observable, Observer, Store, StoreBuilder, Subscription, WeakStore};
}
