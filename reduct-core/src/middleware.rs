//! Middleware pipeline around the store's dispatch
//!
//! A middleware receives a [`MiddlewareApi`] once, when the store is built,
//! and returns a [`Link`]: a function wrapping the next dispatch in the chain.
//! [`apply_middleware`] composes the links right to left, so the first
//! middleware in the list is the outermost one and sees every intent first.
//!
//! # Example
//!
//! ```ignore
//! use reduct::prelude::*;
//!
//! let store = Store::builder(reducer)
//!     .enhancer(apply_middleware(vec![
//!         Box::new(LoggingMiddleware::new()),
//!         Box::new(ThunkMiddleware),
//!     ]))
//!     .build()?;
//!
//! store.dispatch_thunk(|api| {
//!     api.dispatch(AppAction::FetchStart)?;
//!     api.dispatch(AppAction::FetchDone)
//! })?;
//! ```

use std::fmt;
use std::rc::Rc;

use crate::action::Action;
use crate::compose::{compose, BoxedFn};
use crate::error::{Result, StoreError};
use crate::reducer::SharedReducer;
use crate::store::{Enhancer, Store, StoreCreator, WeakStore};

/// Result of a dispatch through the chain.
///
/// `Some(action)` when the action reached the reducer (or a middleware
/// passed one back), `None` when a middleware absorbed the intent.
pub type DispatchResult<A> = Result<Option<A>>;

/// A deferred unit of work run by [`ThunkMiddleware`] instead of a reducer
pub type Thunk<S, A> = Box<dyn FnOnce(&MiddlewareApi<S, A>) -> DispatchResult<A>>;

/// A dispatch function: the store's own, or one wrapped by middleware
pub type DispatchFn<S, A> = Rc<dyn Fn(Intent<S, A>) -> DispatchResult<A>>;

/// One link of the middleware chain: given the next dispatch, returns the
/// dispatch that wraps it
pub type Link<S, A> = BoxedFn<DispatchFn<S, A>>;

/// Anything that can be sent down the middleware chain.
///
/// Only [`Intent::Action`] is a plain data record; a thunk that reaches the
/// store's own dispatch is rejected with [`StoreError::InvalidAction`].
pub enum Intent<S, A> {
    Action(A),
    Thunk(Thunk<S, A>),
}

impl<S, A: Action> Intent<S, A> {
    /// Wrap a closure as a thunk intent
    pub fn thunk<F>(f: F) -> Self
    where
        F: FnOnce(&MiddlewareApi<S, A>) -> DispatchResult<A> + 'static,
    {
        Intent::Thunk(Box::new(f))
    }

    /// The action name, if this intent is an action
    pub fn name(&self) -> Option<&str> {
        match self {
            Intent::Action(action) => Some(action.name()),
            Intent::Thunk(_) => None,
        }
    }
}

impl<S, A: fmt::Debug> fmt::Debug for Intent<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Intent::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

/// The store surface handed to each middleware.
///
/// `dispatch` always goes through the store's *current* dispatch, so a
/// middleware that captured the API before the chain was wired still sends
/// intents through the full chain.
pub struct MiddlewareApi<S, A> {
    store: WeakStore<S, A>,
}

impl<S, A> Clone for MiddlewareApi<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S, A> fmt::Debug for MiddlewareApi<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareApi").finish_non_exhaustive()
    }
}

impl<S: 'static, A: Action> MiddlewareApi<S, A> {
    pub fn new(store: WeakStore<S, A>) -> Self {
        Self { store }
    }

    fn store(&self) -> Result<Store<S, A>> {
        self.store.upgrade().ok_or(StoreError::Detached)
    }

    /// Current state of the store
    pub fn state(&self) -> Result<Rc<S>> {
        Ok(self.store()?.state())
    }

    /// Dispatch an action through the full chain
    pub fn dispatch(&self, action: A) -> DispatchResult<A> {
        self.dispatch_intent(Intent::Action(action))
    }

    /// Dispatch any intent through the full chain
    pub fn dispatch_intent(&self, intent: Intent<S, A>) -> DispatchResult<A> {
        self.store()?.dispatch_intent(intent)
    }
}

/// Middleware for intercepting dispatched intents
///
/// Implement this trait to add logging, async side effects, validation or
/// other cross-cutting concerns. Closures of the form
/// `Fn(MiddlewareApi<S, A>) -> Link<S, A>` implement it directly; for the
/// common "look at the intent, then call next" shape use [`middleware_fn`].
pub trait Middleware<S, A> {
    /// Build this middleware's link in the chain
    fn link(&self, api: MiddlewareApi<S, A>) -> Link<S, A>;
}

impl<S, A, F> Middleware<S, A> for F
where
    F: Fn(MiddlewareApi<S, A>) -> Link<S, A>,
{
    fn link(&self, api: MiddlewareApi<S, A>) -> Link<S, A> {
        self(api)
    }
}

/// Middleware built by [`middleware_fn`]
pub struct FnMiddleware<F>(Rc<F>);

/// Build a middleware from a closure receiving the API, the intent and the
/// next dispatch.
///
/// # Example
/// ```ignore
/// let audit = middleware_fn(|api: &MiddlewareApi<State, AppAction>, intent, next| {
///     tracing::info!(intent = ?intent.name(), "audit");
///     next(intent)
/// });
/// ```
pub fn middleware_fn<S, A, F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&MiddlewareApi<S, A>, Intent<S, A>, &DispatchFn<S, A>) -> DispatchResult<A> + 'static,
{
    FnMiddleware(Rc::new(f))
}

impl<S, A, F> Middleware<S, A> for FnMiddleware<F>
where
    S: 'static,
    A: Action,
    F: Fn(&MiddlewareApi<S, A>, Intent<S, A>, &DispatchFn<S, A>) -> DispatchResult<A> + 'static,
{
    fn link(&self, api: MiddlewareApi<S, A>) -> Link<S, A> {
        let f = self.0.clone();
        Box::new(move |next: DispatchFn<S, A>| -> DispatchFn<S, A> {
            let f = f.clone();
            let api = api.clone();
            Rc::new(move |intent: Intent<S, A>| f(&api, intent, &next))
        })
    }
}

/// Build an enhancer that installs `middlewares` around the store's dispatch.
///
/// The inner store is created first; each middleware then receives a shared
/// [`MiddlewareApi`] and contributes one link. Links are composed right to
/// left over the store's dispatch, making `middlewares[0]` the outermost
/// wrapper. All other store operations are unaffected.
pub fn apply_middleware<S, A>(middlewares: Vec<Box<dyn Middleware<S, A>>>) -> Enhancer<S, A>
where
    S: 'static,
    A: Action,
{
    let middlewares: Rc<[Box<dyn Middleware<S, A>>]> = Rc::from(middlewares);

    Box::new(move |create: StoreCreator<S, A>| -> StoreCreator<S, A> {
        let middlewares = middlewares.clone();
        Rc::new(
            move |reducer: SharedReducer<S, A>, preloaded: Option<Rc<S>>| -> Result<Store<S, A>> {
                let store = create(reducer, preloaded)?;
                let api = MiddlewareApi::new(store.downgrade());

                let chain: Vec<Link<S, A>> = middlewares
                    .iter()
                    .map(|middleware| middleware.link(api.clone()))
                    .collect();
                let dispatch = compose(chain)(store.dispatcher());
                store.set_dispatcher(dispatch);

                tracing::debug!(count = middlewares.len(), "Installed middleware chain");
                Ok(store)
            },
        )
    })
}

/// Runs [`Intent::Thunk`] intents with the middleware API instead of
/// forwarding them, so they never reach the reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThunkMiddleware;

impl<S: 'static, A: Action> Middleware<S, A> for ThunkMiddleware {
    fn link(&self, api: MiddlewareApi<S, A>) -> Link<S, A> {
        Box::new(move |next: DispatchFn<S, A>| -> DispatchFn<S, A> {
            let api = api.clone();
            Rc::new(move |intent: Intent<S, A>| match intent {
                Intent::Thunk(thunk) => thunk(&api),
                action => next(action),
            })
        })
    }
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before dispatch
    pub log_before: bool,
    /// Whether to log after dispatch
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<S: 'static, A: Action> Middleware<S, A> for LoggingMiddleware {
    fn link(&self, api: MiddlewareApi<S, A>) -> Link<S, A> {
        let config = self.clone();
        Box::new(move |next: DispatchFn<S, A>| -> DispatchFn<S, A> {
            let api = api.clone();
            let config = config.clone();
            Rc::new(move |intent: Intent<S, A>| {
                let Some(name) = intent.name().map(str::to_owned) else {
                    return next(intent);
                };

                if config.log_before {
                    tracing::debug!(action = %name, "Dispatching action");
                }
                let before = api.state().ok();
                let result = next(intent);
                if config.log_after {
                    let state_changed = match (before, api.state().ok()) {
                        (Some(before), Some(after)) => !Rc::ptr_eq(&before, &after),
                        _ => false,
                    };
                    tracing::debug!(
                        action = %name,
                        state_changed = state_changed,
                        ok = result.is_ok(),
                        "Action processed"
                    );
                }
                result
            })
        })
    }
}
