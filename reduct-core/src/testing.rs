//! Test utilities for reduct applications
//!
//! - [`ActionRecorder`]: middleware that records every action passing through it
//! - [`StoreHarness`]: a store wired with a recorder and a listener counter
//! - Assertion macros for verifying dispatched actions
//!
//! # Example
//!
//! ```ignore
//! use reduct::testing::StoreHarness;
//! use reduct::assert_dispatched;
//!
//! let harness = StoreHarness::new(counter)?;
//! harness.dispatch(Action::Increment)?;
//!
//! let actions = harness.drain_dispatched();
//! assert_dispatched!(actions, Action::Increment);
//! assert_eq!(*harness.state(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::action::Action;
use crate::error::Result;
use crate::middleware::{
    apply_middleware, DispatchFn, DispatchResult, Intent, Link, Middleware, MiddlewareApi,
};
use crate::reducer::Reducer;
use crate::store::{Store, Subscription};

/// Middleware that records each action it forwards.
///
/// Thunks are forwarded without being recorded. Clones share the same
/// record, so keep one to inspect after installing another.
#[derive(Debug)]
pub struct ActionRecorder<A> {
    actions: Rc<RefCell<Vec<A>>>,
}

impl<A> Clone for ActionRecorder<A> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
        }
    }
}

impl<A> Default for ActionRecorder<A> {
    fn default() -> Self {
        Self {
            actions: Rc::default(),
        }
    }
}

impl<A: Action> ActionRecorder<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded actions, oldest first
    pub fn actions(&self) -> Vec<A> {
        self.actions.borrow().clone()
    }

    /// Take all recorded actions, leaving the record empty
    pub fn drain(&self) -> Vec<A> {
        self.actions.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.borrow().is_empty()
    }
}

impl<S: 'static, A: Action> Middleware<S, A> for ActionRecorder<A> {
    fn link(&self, _api: MiddlewareApi<S, A>) -> Link<S, A> {
        let actions = self.actions.clone();
        Box::new(move |next: DispatchFn<S, A>| -> DispatchFn<S, A> {
            let actions = actions.clone();
            Rc::new(move |intent: Intent<S, A>| {
                if let Intent::Action(action) = &intent {
                    actions.borrow_mut().push(action.clone());
                }
                next(intent)
            })
        })
    }
}

/// A store with an [`ActionRecorder`] as its outermost middleware and a
/// counter of listener notifications.
///
/// # Example
///
/// ```ignore
/// let harness = StoreHarness::with_middleware(reducer, vec![Box::new(ThunkMiddleware)])?;
/// harness.dispatch(Action::Load)?;
/// assert_eq!(harness.notifications(), 1);
/// ```
pub struct StoreHarness<S, A> {
    store: Store<S, A>,
    recorder: ActionRecorder<A>,
    notifications: Rc<Cell<usize>>,
    _subscription: Subscription,
}

impl<S: 'static, A: Action> StoreHarness<S, A> {
    /// Create a harness around `reducer` with no other middleware
    pub fn new<R>(reducer: R) -> Result<Self>
    where
        R: Reducer<S, A> + 'static,
    {
        Self::with_middleware(reducer, Vec::new())
    }

    /// Create a harness whose recorder wraps `middlewares`
    pub fn with_middleware<R>(reducer: R, middlewares: Vec<Box<dyn Middleware<S, A>>>) -> Result<Self>
    where
        R: Reducer<S, A> + 'static,
    {
        let recorder = ActionRecorder::new();
        let mut chain: Vec<Box<dyn Middleware<S, A>>> = vec![Box::new(recorder.clone())];
        chain.extend(middlewares);

        let store = Store::builder(reducer)
            .enhancer(apply_middleware(chain))
            .build()?;

        let notifications = Rc::new(Cell::new(0));
        let counter = notifications.clone();
        let subscription = store.subscribe(move || counter.set(counter.get() + 1));

        Ok(Self {
            store,
            recorder,
            notifications,
            _subscription: subscription,
        })
    }

    pub fn store(&self) -> &Store<S, A> {
        &self.store
    }

    pub fn state(&self) -> Rc<S> {
        self.store.state()
    }

    pub fn dispatch(&self, action: A) -> DispatchResult<A> {
        self.store.dispatch(action)
    }

    /// Dispatch several actions, stopping at the first error
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = A>) -> Result<()> {
        for action in actions {
            self.store.dispatch(action)?;
        }
        Ok(())
    }

    /// Take every action recorded so far
    pub fn drain_dispatched(&self) -> Vec<A> {
        self.recorder.drain()
    }

    /// Number of listener notifications since the harness was created
    pub fn notifications(&self) -> usize {
        self.notifications.get()
    }
}

/// Assert that a specific action was dispatched.
///
/// # Example
///
/// ```ignore
/// use reduct::assert_dispatched;
///
/// let actions = harness.drain_dispatched();
/// assert_dispatched!(actions, Action::Increment);
/// assert_dispatched!(actions, Action::SetValue(n) if *n > 40);
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be dispatched, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that a specific action was NOT dispatched.
#[macro_export]
macro_rules! assert_not_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be dispatched, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Find and return the first action matching a pattern.
///
/// # Example
///
/// ```ignore
/// if let Some(Action::SetValue(v)) = find_dispatched!(actions, Action::SetValue(_)) {
///     assert_eq!(*v, 42);
/// }
/// ```
#[macro_export]
macro_rules! find_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count how many actions match a pattern.
#[macro_export]
macro_rules! count_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}
