//! Reducer trait and helpers

use std::rc::Rc;

use crate::action::Envelope;
use crate::error::Result;

/// Outcome of a reducer call.
///
/// `Ok(None)` means the reducer produced no state at all, which the store
/// and the reducer combinator treat as a contract violation. A reducer that
/// ignores an action returns the previous `Rc` unchanged.
pub type Reduced<S> = Result<Option<Rc<S>>>;

/// A pure state transition function
///
/// Reducers receive the previous state (absent before the store has been
/// bootstrapped) and an [`Envelope`], and return the next state. State is
/// never mutated in place: returning the same `Rc` signals "no change",
/// which downstream code detects with [`Rc::ptr_eq`].
///
/// Plain functions and closures with the signature
/// `Fn(Option<Rc<S>>, Envelope<'_, A>) -> Option<Rc<S>>` implement this
/// trait. Implement it directly for reducers that can fail.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use reduct_core::{Action, Envelope};
///
/// #[derive(Clone, Debug)]
/// enum CounterAction { Increment }
///
/// impl Action for CounterAction {
///     fn name(&self) -> &str { "Increment" }
/// }
///
/// fn counter(state: Option<Rc<i32>>, action: Envelope<'_, CounterAction>) -> Option<Rc<i32>> {
///     let state = state.unwrap_or_else(|| Rc::new(0));
///     match action {
///         Envelope::Action(CounterAction::Increment) => Some(Rc::new(*state + 1)),
///         _ => Some(state),
///     }
/// }
/// ```
pub trait Reducer<S, A> {
    /// Compute the next state for `action`
    fn reduce(&self, state: Option<Rc<S>>, action: Envelope<'_, A>) -> Reduced<S>;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(Option<Rc<S>>, Envelope<'_, A>) -> Option<Rc<S>>,
{
    fn reduce(&self, state: Option<Rc<S>>, action: Envelope<'_, A>) -> Reduced<S> {
        Ok(self(state, action))
    }
}

/// A reducer shared between the store and whoever installed it
pub type SharedReducer<S, A> = Rc<dyn Reducer<S, A>>;

/// Reducer built by [`with_initial`]
pub struct WithInitial<I, F> {
    initial: I,
    update: F,
}

/// Build a total reducer from an initial-state constructor and an update
/// function.
///
/// `update` sees only application actions and returns `Some(next)` to
/// replace the state or `None` to keep it. Reserved and unhandled actions
/// always yield the current state, or `initial()` when there is none, so the
/// resulting reducer can never produce an absent state.
///
/// # Example
/// ```
/// use reduct_core::{with_initial, Action};
///
/// #[derive(Clone, Debug)]
/// enum Toggle { Flip }
///
/// impl Action for Toggle {
///     fn name(&self) -> &str { "Flip" }
/// }
///
/// let reducer = with_initial(|| false, |on: &bool, action: &Toggle| match action {
///     Toggle::Flip => Some(!*on),
/// });
/// # let _ = reducer;
/// ```
pub fn with_initial<S, A, I, F>(initial: I, update: F) -> WithInitial<I, F>
where
    I: Fn() -> S,
    F: Fn(&S, &A) -> Option<S>,
{
    WithInitial { initial, update }
}

impl<S, A, I, F> Reducer<S, A> for WithInitial<I, F>
where
    I: Fn() -> S,
    F: Fn(&S, &A) -> Option<S>,
{
    fn reduce(&self, state: Option<Rc<S>>, action: Envelope<'_, A>) -> Reduced<S> {
        let state = state.unwrap_or_else(|| Rc::new((self.initial)()));
        let next = match action.action() {
            Some(action) => (self.update)(&state, action).map(Rc::new),
            None => None,
        };
        Ok(Some(next.unwrap_or(state)))
    }
}
