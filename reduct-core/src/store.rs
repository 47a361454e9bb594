//! Centralized state store with reducer pattern

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::action::{action_types, Action, Envelope};
use crate::compose::BoxedFn;
use crate::error::{Result, StoreError};
use crate::middleware::{DispatchFn, DispatchResult, Intent, MiddlewareApi};
use crate::reducer::{Reducer, SharedReducer};

/// Base store constructor: a reducer and optional preloaded state in, a
/// bootstrapped store out. Enhancers wrap one of these.
pub type StoreCreator<S, A> = Rc<dyn Fn(SharedReducer<S, A>, Option<Rc<S>>) -> Result<Store<S, A>>>;

/// Wraps store construction; see [`apply_middleware`](crate::apply_middleware).
///
/// Enhancers are plain [`BoxedFn`]s, so several of them are combined with
/// [`compose`](crate::compose) before being handed to the builder.
pub type Enhancer<S, A> = BoxedFn<StoreCreator<S, A>>;

type Listener = Rc<dyn Fn()>;

/// Copy-on-write listener registry.
///
/// Notification takes a snapshot by cloning the `Rc`. Any mutation while a
/// snapshot is alive goes through [`Rc::make_mut`] and clones the list first,
/// so an in-flight notification never sees subscribes or unsubscribes.
#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Rc<Vec<(u64, Listener)>>,
}

impl Listeners {
    fn insert(&mut self, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        Rc::make_mut(&mut self.entries).push((id, listener));
        id
    }

    fn remove(&mut self, id: u64) {
        if let Some(index) = self.entries.iter().position(|(entry, _)| *entry == id) {
            Rc::make_mut(&mut self.entries).remove(index);
        }
    }

    fn snapshot(&self) -> Rc<Vec<(u64, Listener)>> {
        self.entries.clone()
    }
}

/// Clears the dispatching flag when dropped, including on unwind.
struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self> {
        if flag.replace(true) {
            return Err(StoreError::Reentrancy);
        }
        Ok(Self { flag })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

struct StoreInner<S, A> {
    state: RefCell<Rc<S>>,
    reducer: RefCell<SharedReducer<S, A>>,
    listeners: Rc<RefCell<Listeners>>,
    dispatching: Cell<bool>,
    /// Installed by enhancers; `None` means the raw dispatch
    dispatcher: RefCell<Option<DispatchFn<S, A>>>,
}

/// Centralized state store
///
/// The store holds the application state and runs every action through the
/// reducer. A store is always bootstrapped: construction runs the reducer
/// with the INIT action, so [`Store::state`] never observes an absent state.
///
/// `Store` is a cheap, cloneable handle; all clones share the same state.
///
/// # Example
///
/// ```ignore
/// let store = Store::new(counter)?;
/// store.dispatch(CounterAction::Increment)?;
/// assert_eq!(*store.state(), 1);
/// ```
pub struct Store<S, A> {
    inner: Rc<StoreInner<S, A>>,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.borrow())
            .field("listeners", &self.inner.listeners.borrow().entries.len())
            .field("dispatching", &self.inner.dispatching.get())
            .finish()
    }
}

/// Non-owning handle to a [`Store`].
///
/// Listeners and middleware that need the store should hold one of these
/// to avoid keeping it alive through a reference cycle.
pub struct WeakStore<S, A> {
    inner: Weak<StoreInner<S, A>>,
}

impl<S, A> Clone for WeakStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, A> WeakStore<S, A> {
    pub fn upgrade(&self) -> Option<Store<S, A>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

/// The built-in store constructor.
///
/// Runs `reducer` once with the INIT action over `preloaded` and fails with
/// [`StoreError::UndefinedState`] if it produces nothing.
pub fn create_store<S, A>(reducer: SharedReducer<S, A>, preloaded: Option<Rc<S>>) -> Result<Store<S, A>>
where
    S: 'static,
    A: Action,
{
    let state = reducer
        .reduce(preloaded, Envelope::Init)?
        .ok_or_else(|| StoreError::UndefinedState {
            action_type: action_types::INIT.to_string(),
        })?;

    tracing::debug!("Store bootstrapped");
    Ok(Store {
        inner: Rc::new(StoreInner {
            state: RefCell::new(state),
            reducer: RefCell::new(reducer),
            listeners: Rc::default(),
            dispatching: Cell::new(false),
            dispatcher: RefCell::new(None),
        }),
    })
}

impl<S: 'static, A: Action> Store<S, A> {
    /// Create a store with no preloaded state and no enhancer
    pub fn new<R>(reducer: R) -> Result<Self>
    where
        R: Reducer<S, A> + 'static,
    {
        Self::builder(reducer).build()
    }

    /// Start configuring a store around `reducer`
    pub fn builder<R>(reducer: R) -> StoreBuilder<S, A>
    where
        R: Reducer<S, A> + 'static,
    {
        StoreBuilder::new(reducer)
    }

    /// Get the current state
    ///
    /// Inside a reducer this is the state *before* the action being reduced.
    pub fn state(&self) -> Rc<S> {
        self.inner.state.borrow().clone()
    }

    /// Dispatch an action through the installed dispatch
    ///
    /// Returns the action that reached the reducer, or `None` when a
    /// middleware absorbed it.
    pub fn dispatch(&self, action: A) -> DispatchResult<A> {
        self.dispatch_intent(Intent::Action(action))
    }

    /// Dispatch a thunk; requires [`ThunkMiddleware`](crate::ThunkMiddleware)
    pub fn dispatch_thunk<F>(&self, thunk: F) -> DispatchResult<A>
    where
        F: FnOnce(&MiddlewareApi<S, A>) -> DispatchResult<A> + 'static,
    {
        self.dispatch_intent(Intent::thunk(thunk))
    }

    /// Dispatch any intent through the installed dispatch
    pub fn dispatch_intent(&self, intent: Intent<S, A>) -> DispatchResult<A> {
        let installed = self.inner.dispatcher.borrow().clone();
        match installed {
            Some(dispatch) => dispatch(intent),
            None => self.dispatch_raw(intent),
        }
    }

    /// The dispatch currently installed on this store
    ///
    /// Before any enhancer has replaced it this is the store's own dispatch.
    pub fn dispatcher(&self) -> DispatchFn<S, A> {
        if let Some(dispatch) = self.inner.dispatcher.borrow().as_ref() {
            return dispatch.clone();
        }
        let store = self.downgrade();
        Rc::new(move |intent: Intent<S, A>| {
            store
                .upgrade()
                .ok_or(StoreError::Detached)?
                .dispatch_raw(intent)
        })
    }

    /// Replace the dispatch used by [`Store::dispatch`]
    pub fn set_dispatcher(&self, dispatch: DispatchFn<S, A>) {
        *self.inner.dispatcher.borrow_mut() = Some(dispatch);
    }

    /// Register a change listener
    ///
    /// The listener is called after every completed dispatch, in
    /// subscription order. A subscription made during a notification takes
    /// effect from the next dispatch; an unsubscribe made during a
    /// notification does not stop the current round.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        let id = self.inner.listeners.borrow_mut().insert(Rc::new(listener));
        tracing::trace!(id, "Listener subscribed");
        Subscription {
            listeners: Rc::downgrade(&self.inner.listeners),
            id,
            subscribed: Cell::new(true),
        }
    }

    /// Swap the reducer and re-bootstrap the state with the INIT action
    ///
    /// Slices the new reducer introduces get their initial state; existing
    /// slices keep theirs. Listeners are notified.
    pub fn replace_reducer<R>(&self, reducer: R) -> Result<()>
    where
        R: Reducer<S, A> + 'static,
    {
        if self.inner.dispatching.get() {
            return Err(StoreError::Reentrancy);
        }
        *self.inner.reducer.borrow_mut() = Rc::new(reducer);
        tracing::debug!("Reducer replaced");

        self.reduce(Envelope::Init)?;
        self.notify();
        Ok(())
    }

    /// Get a non-owning handle to this store
    pub fn downgrade(&self) -> WeakStore<S, A> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of active listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().entries.len()
    }

    /// Whether a reducer is currently running
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.get()
    }

    fn dispatch_raw(&self, intent: Intent<S, A>) -> DispatchResult<A> {
        let action = match intent {
            Intent::Action(action) => action,
            Intent::Thunk(_) => {
                return Err(StoreError::InvalidAction(
                    "got a thunk with no middleware to run it".into(),
                ))
            }
        };
        action.validate()?;

        tracing::debug!(action = %action.name(), "Dispatching action");
        self.reduce(Envelope::Action(&action))?;
        self.notify();
        Ok(Some(action))
    }

    /// Run the reducer under the dispatching flag and commit its result.
    ///
    /// Nothing is committed if the reducer fails.
    fn reduce(&self, action: Envelope<'_, A>) -> Result<()> {
        let _guard = DispatchGuard::acquire(&self.inner.dispatching)?;

        let reducer = self.inner.reducer.borrow().clone();
        let previous = self.state();
        let next = reducer
            .reduce(Some(previous), action)?
            .ok_or_else(|| StoreError::UndefinedState {
                action_type: action.action_type().to_string(),
            })?;

        *self.inner.state.borrow_mut() = next;
        Ok(())
    }

    fn notify(&self) {
        let snapshot = self.inner.listeners.borrow().snapshot();
        tracing::trace!(count = snapshot.len(), "Notifying listeners");
        for (_, listener) in snapshot.iter() {
            listener();
        }
    }
}

/// Handle returned by [`Store::subscribe`]
///
/// Dropping a subscription does not unsubscribe; call
/// [`Subscription::unsubscribe`].
pub struct Subscription {
    listeners: Weak<RefCell<Listeners>>,
    id: u64,
    subscribed: Cell<bool>,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.subscribed.replace(false) {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().remove(self.id);
            tracing::trace!(id = self.id, "Listener unsubscribed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.get()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subscribed", &self.subscribed.get())
            .finish()
    }
}

/// Receives state values from an [`Observable`]
///
/// The default `next` ignores the value. Closures taking `Rc<S>` implement
/// this trait.
pub trait Observer<S> {
    fn next(&self, _state: Rc<S>) {}
}

impl<S, F> Observer<S> for F
where
    F: Fn(Rc<S>),
{
    fn next(&self, state: Rc<S>) {
        self(state)
    }
}

/// Observable view of a state source
pub trait Observable<S> {
    /// Push the current state to `observer` now and after every dispatch
    fn subscribe_observer<O>(&self, observer: O) -> Subscription
    where
        O: Observer<S> + 'static;
}

impl<S: 'static, A: Action> Observable<S> for Store<S, A> {
    fn subscribe_observer<O>(&self, observer: O) -> Subscription
    where
        O: Observer<S> + 'static,
    {
        let store = self.downgrade();
        let observe = move || {
            if let Some(store) = store.upgrade() {
                observer.next(store.state());
            }
        };
        observe();
        self.subscribe(observe)
    }
}

/// Builder for [`Store`]
pub struct StoreBuilder<S, A> {
    reducer: SharedReducer<S, A>,
    preloaded: Option<Rc<S>>,
    enhancers: Vec<Enhancer<S, A>>,
}

impl<S: 'static, A: Action> StoreBuilder<S, A> {
    pub fn new<R>(reducer: R) -> Self
    where
        R: Reducer<S, A> + 'static,
    {
        Self {
            reducer: Rc::new(reducer),
            preloaded: None,
            enhancers: Vec::new(),
        }
    }

    /// Seed the store with existing state, e.g. restored from disk
    pub fn preloaded_state(mut self, state: impl Into<Rc<S>>) -> Self {
        self.preloaded = Some(state.into());
        self
    }

    /// Set the store enhancer
    pub fn enhancer(mut self, enhancer: Enhancer<S, A>) -> Self {
        self.enhancers.push(enhancer);
        self
    }

    /// Build and bootstrap the store
    pub fn build(self) -> Result<Store<S, A>> {
        if self.enhancers.len() > 1 {
            return Err(StoreError::InvalidArgument(format!(
                "received {} store enhancers; compose them together into a single enhancer",
                self.enhancers.len()
            )));
        }

        let base: StoreCreator<S, A> = Rc::new(create_store::<S, A>);
        let create = match self.enhancers.into_iter().next() {
            Some(enhancer) => enhancer(base),
            None => base,
        };
        create(self.reducer, self.preloaded)
    }
}
