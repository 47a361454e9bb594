//! reduct: predictable single-store state management
//!
//! All application state lives in one store. The only way to change it is to
//! dispatch an action, which a pure reducer turns into the next state.
//! Middleware wraps dispatch for logging, thunks and other side effects, and
//! `combine_reducers` splits a large reducer into independent slices.
//!
//! # Example
//! ```ignore
//! use std::rc::Rc;
//! use reduct::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(prefix = "counter/")]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! let store = Store::builder(combine_reducers(ReducerMap::new().slice("counter", counter)))
//!     .enhancer(apply_middleware(vec![
//!         Box::new(LoggingMiddleware::new()),
//!         Box::new(ThunkMiddleware),
//!     ]))
//!     .build()?;
//!
//! store.dispatch(CounterAction::Increment)?;
//! ```

// Re-export everything from core
pub use reduct_core::*;

// Re-export derive macros
pub use reduct_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    pub use reduct_core::prelude::*;

    // Derive macros
    pub use reduct_macros::Action;
}
