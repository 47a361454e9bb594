//! Combining independently-owned slice reducers into one aggregate reducer
//!
//! [`combine_reducers`] fans every action out to a set of named slice
//! reducers and assembles their results into a [`CombinedState`]. When no
//! slice changes identity the incoming aggregate is returned as-is, so
//! listeners can detect "nothing happened" with a single [`Rc::ptr_eq`].
//!
//! # Example
//!
//! ```ignore
//! use reduct::prelude::*;
//!
//! let reducer = combine_reducers(
//!     ReducerMap::new()
//!         .slice("count", counter)
//!         .slice("todos", todos),
//! );
//! let store = Store::new(reducer)?;
//! assert_eq!(store.state().get::<i32>("count"), Some(&0));
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use rand::Rng;

use crate::action::{action_types, Action, Envelope};
use crate::error::{Result, ShapeProbe, StoreError};
use crate::reducer::{Reduced, Reducer};

/// Aggregate state produced by a [`CombinedReducer`]
///
/// Each slice is stored behind its own `Rc`, so a slice that did not change
/// keeps its identity across dispatches.
#[derive(Clone, Default)]
pub struct CombinedState {
    slices: BTreeMap<String, Rc<dyn Any>>,
}

impl CombinedState {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a slice (useful for building preloaded state)
    pub fn with_slice<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.slices.insert(key.into(), Rc::new(value));
        self
    }

    /// Borrow a slice's value, if present and of type `T`
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.slices.get(key)?.downcast_ref::<T>()
    }

    /// Get a shared handle to a slice, if present and of type `T`
    pub fn slice<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        self.slices.get(key)?.clone().downcast::<T>().ok()
    }

    /// Whether a slice exists under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.slices.contains_key(key)
    }

    /// Slice keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    fn raw(&self, key: &str) -> Option<&Rc<dyn Any>> {
        self.slices.get(key)
    }
}

impl fmt::Debug for CombinedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedState")
            .field("keys", &self.slices.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Type-erased slice reducer.
///
/// Returns the slice's next value and whether it differs by identity from
/// the previous one.
trait SliceReducer<A> {
    fn reduce_slice(
        &self,
        key: &str,
        previous: Option<&Rc<dyn Any>>,
        action: Envelope<'_, A>,
    ) -> Result<Option<(Rc<dyn Any>, bool)>>;
}

struct TypedSlice<S, R> {
    reducer: R,
    _marker: PhantomData<fn() -> S>,
}

impl<S, A, R> SliceReducer<A> for TypedSlice<S, R>
where
    S: 'static,
    R: Reducer<S, A>,
{
    fn reduce_slice(
        &self,
        key: &str,
        previous: Option<&Rc<dyn Any>>,
        action: Envelope<'_, A>,
    ) -> Result<Option<(Rc<dyn Any>, bool)>> {
        let previous = match previous {
            Some(value) => Some(value.clone().downcast::<S>().map_err(|_| {
                StoreError::SliceTypeMismatch {
                    key: key.to_string(),
                    expected: type_name::<S>(),
                }
            })?),
            None => None,
        };

        let next = self.reducer.reduce(previous.clone(), action)?;
        Ok(next.map(|next| {
            let changed = previous.map_or(true, |prev| !Rc::ptr_eq(&prev, &next));
            (next as Rc<dyn Any>, changed)
        }))
    }
}

/// Named slice reducers to pass to [`combine_reducers`]
///
/// Slices are reduced in registration order. Registering the same key twice
/// replaces the earlier reducer but keeps its position.
pub struct ReducerMap<A> {
    entries: Vec<(String, Option<Box<dyn SliceReducer<A>>>)>,
}

impl<A: Action> Default for ReducerMap<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> ReducerMap<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register the reducer owning slice `key`
    pub fn slice<S, R>(self, key: impl Into<String>, reducer: R) -> Self
    where
        S: 'static,
        R: Reducer<S, A> + 'static,
    {
        self.insert(key.into(), Some(Box::new(TypedSlice::<S, R> {
            reducer,
            _marker: PhantomData,
        })))
    }

    /// Register a slice whose reducer may be missing.
    ///
    /// Missing reducers are dropped when the map is combined; in diagnostic
    /// mode a warning names the key.
    pub fn maybe_slice<S, R>(self, key: impl Into<String>, reducer: Option<R>) -> Self
    where
        S: 'static,
        R: Reducer<S, A> + 'static,
    {
        match reducer {
            Some(reducer) => self.slice(key, reducer),
            None => self.insert(key.into(), None),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(mut self, key: String, reducer: Option<Box<dyn SliceReducer<A>>>) -> Self {
        match self.entries.iter().position(|(existing, _)| *existing == key) {
            Some(index) => self.entries[index].1 = reducer,
            None => self.entries.push((key, reducer)),
        }
        self
    }
}

/// Configuration for [`combine_reducers_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineConfig {
    /// Emit advisory warnings (missing reducers, empty map, unexpected
    /// state keys). Warnings never change results.
    pub diagnostics: bool,
}

impl Default for CombineConfig {
    /// Diagnostics are on in debug builds and off in release builds
    fn default() -> Self {
        Self {
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl CombineConfig {
    /// Diagnostics enabled regardless of build profile
    pub fn diagnostic() -> Self {
        Self { diagnostics: true }
    }

    /// Diagnostics disabled regardless of build profile
    pub fn production() -> Self {
        Self { diagnostics: false }
    }
}

/// The aggregate reducer returned by [`combine_reducers`]
pub struct CombinedReducer<A> {
    reducers: Vec<(String, Box<dyn SliceReducer<A>>)>,
    shape_error: Option<StoreError>,
    unexpected_key_cache: RefCell<HashSet<String>>,
    config: CombineConfig,
}

impl<A> fmt::Debug for CombinedReducer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("shape_error", &self.shape_error)
            .field("config", &self.config)
            .finish()
    }
}

impl<A> CombinedReducer<A> {
    /// Keys of the retained slice reducers, in reduction order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.reducers.iter().map(|(key, _)| key.as_str())
    }

    /// The shape violation captured when the reducer was built, if any.
    ///
    /// A reducer holding one fails every call with this error.
    pub fn shape_error(&self) -> Option<&StoreError> {
        self.shape_error.as_ref()
    }
}

/// Combine slice reducers with the default [`CombineConfig`]
pub fn combine_reducers<A: Action>(map: ReducerMap<A>) -> CombinedReducer<A> {
    combine_reducers_with(map, CombineConfig::default())
}

/// Combine slice reducers into one aggregate reducer.
///
/// Missing reducers are dropped. Every retained reducer is probed with the
/// bootstrap action and with a random unknown action type, both with no
/// previous state; if any probe yields no state the violation is captured
/// and raised on every call to the aggregate reducer.
pub fn combine_reducers_with<A: Action>(
    map: ReducerMap<A>,
    config: CombineConfig,
) -> CombinedReducer<A> {
    let mut reducers = Vec::with_capacity(map.entries.len());
    for (key, reducer) in map.entries {
        match reducer {
            Some(reducer) => reducers.push((key, reducer)),
            None => {
                if config.diagnostics {
                    tracing::warn!(key = %key, "No reducer provided for key \"{}\"", key);
                }
            }
        }
    }

    let shape_error = assert_reducer_shape(&reducers).err();
    if let Some(ref error) = shape_error {
        tracing::debug!(%error, "Captured reducer shape violation");
    }

    CombinedReducer {
        reducers,
        shape_error,
        unexpected_key_cache: RefCell::new(HashSet::new()),
        config,
    }
}

fn assert_reducer_shape<A: Action>(reducers: &[(String, Box<dyn SliceReducer<A>>)]) -> Result<()> {
    for (key, reducer) in reducers {
        if reducer.reduce_slice(key, None, Envelope::Init)?.is_none() {
            return Err(StoreError::ReducerShapeViolation {
                key: key.clone(),
                probe: ShapeProbe::Init,
            });
        }

        let probe = probe_action_type();
        if reducer
            .reduce_slice(key, None, Envelope::Probe(&probe))?
            .is_none()
        {
            return Err(StoreError::ReducerShapeViolation {
                key: key.clone(),
                probe: ShapeProbe::UnknownAction,
            });
        }
    }
    Ok(())
}

/// A fresh, unpredictable action type in the reserved namespace
fn probe_action_type() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let token: Vec<String> = (0..7)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]).to_string())
        .collect();
    format!(
        "{}{}",
        action_types::PROBE_UNKNOWN_ACTION_PREFIX,
        token.join(".")
    )
}

impl<A: Action> CombinedReducer<A> {
    fn has_reducer(&self, key: &str) -> bool {
        self.reducers.iter().any(|(existing, _)| existing == key)
    }

    fn warn_unexpected_shape(&self, state: &CombinedState, action: Envelope<'_, A>) {
        if self.reducers.is_empty() {
            tracing::warn!(
                "Store does not have a valid reducer. Make sure the map passed \
                 to combine_reducers contains reducers."
            );
            return;
        }

        let argument = if action.is_init() {
            "preloaded state passed to the store"
        } else {
            "previous state received by the reducer"
        };

        let mut cache = self.unexpected_key_cache.borrow_mut();
        let mut unexpected = Vec::new();
        for key in state.keys() {
            if !self.has_reducer(key) && cache.insert(key.to_string()) {
                unexpected.push(key);
            }
        }

        if !unexpected.is_empty() {
            let expected: Vec<&str> = self.keys().collect();
            tracing::warn!(
                "Unexpected {} \"{}\" found in {}. Expected to find one of the known \
                 reducer keys instead: \"{}\". Unexpected keys will be ignored.",
                if unexpected.len() > 1 { "keys" } else { "key" },
                unexpected.join("\", \""),
                argument,
                expected.join("\", \"")
            );
        }
    }
}

impl<A: Action> Reducer<CombinedState, A> for CombinedReducer<A> {
    fn reduce(
        &self,
        state: Option<Rc<CombinedState>>,
        action: Envelope<'_, A>,
    ) -> Reduced<CombinedState> {
        if let Some(ref error) = self.shape_error {
            return Err(error.clone());
        }

        let state = state.unwrap_or_default();
        if self.config.diagnostics {
            self.warn_unexpected_shape(&state, action);
        }

        let mut has_changed = false;
        let mut next = CombinedState::new();
        for (key, reducer) in &self.reducers {
            let (value, changed) = reducer
                .reduce_slice(key, state.raw(key), action)?
                .ok_or_else(|| StoreError::UndefinedSliceState {
                    key: key.clone(),
                    action_type: action.action_type().to_string(),
                })?;
            has_changed |= changed;
            next.slices.insert(key.clone(), value);
        }

        Ok(Some(if has_changed { Rc::new(next) } else { state }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Rename(String),
        Explode,
    }

    impl Action for TestAction {
        fn name(&self) -> &str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Rename(_) => "Rename",
                TestAction::Explode => "Explode",
            }
        }
    }

    fn counter(state: Option<Rc<i32>>, action: Envelope<'_, TestAction>) -> Option<Rc<i32>> {
        let state = state.unwrap_or_else(|| Rc::new(0));
        match action {
            Envelope::Action(TestAction::Increment) => Some(Rc::new(*state + 1)),
            _ => Some(state),
        }
    }

    fn name(state: Option<Rc<String>>, action: Envelope<'_, TestAction>) -> Option<Rc<String>> {
        let state = state.unwrap_or_else(|| Rc::new("x".to_string()));
        match action {
            Envelope::Action(TestAction::Rename(next)) => Some(Rc::new(next.clone())),
            _ => Some(state),
        }
    }

    /// Behaves for reserved actions but yields nothing for `Explode`
    fn fragile(state: Option<Rc<u8>>, action: Envelope<'_, TestAction>) -> Option<Rc<u8>> {
        match action {
            Envelope::Action(TestAction::Explode) => None,
            _ => Some(state.unwrap_or_else(|| Rc::new(1))),
        }
    }

    /// Handles the bootstrap action but not unknown ones
    fn init_only(state: Option<Rc<u8>>, action: Envelope<'_, TestAction>) -> Option<Rc<u8>> {
        match action {
            Envelope::Init => Some(Rc::new(0)),
            _ => state,
        }
    }

    fn combined() -> CombinedReducer<TestAction> {
        combine_reducers(ReducerMap::new().slice("count", counter).slice("name", name))
    }

    fn init(reducer: &CombinedReducer<TestAction>) -> Rc<CombinedState> {
        reducer.reduce(None, Envelope::Init).unwrap().unwrap()
    }

    #[test]
    fn test_initial_state_from_slices() {
        let state = init(&combined());
        assert_eq!(state.get::<i32>("count"), Some(&0));
        assert_eq!(state.get::<String>("name").map(String::as_str), Some("x"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_identity_preserved_when_nothing_changes() {
        let reducer = combined();
        let state = init(&reducer);

        let next = reducer
            .reduce(Some(state.clone()), Envelope::Probe("@@reduct/PROBE_UNKNOWN_ACTION_z"))
            .unwrap()
            .unwrap();
        assert!(Rc::ptr_eq(&state, &next));
    }

    #[test]
    fn test_new_aggregate_when_one_slice_changes() {
        let reducer = combined();
        let state = init(&reducer);
        let name_before = state.slice::<String>("name").unwrap();

        let next = reducer
            .reduce(Some(state.clone()), Envelope::Action(&TestAction::Increment))
            .unwrap()
            .unwrap();

        assert!(!Rc::ptr_eq(&state, &next));
        assert_eq!(next.get::<i32>("count"), Some(&1));
        // Untouched slice keeps its identity
        assert!(Rc::ptr_eq(&name_before, &next.slice::<String>("name").unwrap()));
    }

    #[test]
    fn test_undefined_slice_names_key_and_action() {
        let reducer = combine_reducers(ReducerMap::new().slice("fragile", fragile));
        let state = init(&reducer);

        let err = reducer
            .reduce(Some(state), Envelope::Action(&TestAction::Explode))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UndefinedSliceState {
                key: "fragile".into(),
                action_type: "Explode".into(),
            }
        );
    }

    #[test]
    fn test_shape_violation_on_init_is_raised_every_call() {
        let never = |_: Option<Rc<u8>>, _: Envelope<'_, TestAction>| -> Option<Rc<u8>> { None };
        let reducer = combine_reducers(ReducerMap::new().slice("count", counter).slice("never", never));

        let expected = StoreError::ReducerShapeViolation {
            key: "never".into(),
            probe: ShapeProbe::Init,
        };
        assert_eq!(reducer.shape_error(), Some(&expected));
        for _ in 0..3 {
            assert_eq!(reducer.reduce(None, Envelope::Init).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_shape_violation_on_unknown_probe() {
        let reducer = combine_reducers(ReducerMap::new().slice("init_only", init_only));
        assert_eq!(
            reducer.shape_error(),
            Some(&StoreError::ReducerShapeViolation {
                key: "init_only".into(),
                probe: ShapeProbe::UnknownAction,
            })
        );
    }

    #[test]
    fn test_probe_types_are_fresh_and_reserved() {
        let a = probe_action_type();
        let b = probe_action_type();
        assert!(a.starts_with(action_types::PROBE_UNKNOWN_ACTION_PREFIX));
        assert_ne!(a, action_types::INIT);
        assert_ne!(a, b);
    }

    #[test]
    fn test_probe_sees_unknown_type() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let spy = move |state: Option<Rc<u8>>, action: Envelope<'_, TestAction>| -> Option<Rc<u8>> {
            log.borrow_mut().push(action.action_type().to_string());
            Some(state.unwrap_or_else(|| Rc::new(0)))
        };
        let _reducer = combine_reducers(ReducerMap::new().slice("spy", spy));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], action_types::INIT);
        assert!(seen[1].starts_with(action_types::PROBE_UNKNOWN_ACTION_PREFIX));
    }

    type NameReducer = fn(Option<Rc<String>>, Envelope<'_, TestAction>) -> Option<Rc<String>>;

    #[test]
    fn test_missing_reducers_are_dropped() {
        let missing: Option<NameReducer> = None;
        let reducer = combine_reducers_with(
            ReducerMap::new()
                .slice("count", counter)
                .maybe_slice("name", missing),
            CombineConfig::production(),
        );
        assert_eq!(reducer.keys().collect::<Vec<_>>(), vec!["count"]);
        assert!(reducer.shape_error().is_none());

        let state = init(&reducer);
        assert!(!state.contains_key("name"));
    }

    #[test]
    fn test_duplicate_key_replaces_reducer() {
        let calls = Rc::new(Cell::new(0));
        let counted = calls.clone();
        let second = move |state: Option<Rc<i32>>, _: Envelope<'_, TestAction>| -> Option<Rc<i32>> {
            counted.set(counted.get() + 1);
            Some(state.unwrap_or_else(|| Rc::new(42)))
        };
        let reducer = combine_reducers(ReducerMap::new().slice("count", counter).slice("count", second));

        assert_eq!(init(&reducer).get::<i32>("count"), Some(&42));
        assert!(calls.get() > 0);
    }

    #[test]
    fn test_slice_type_mismatch() {
        let reducer = combined();
        let preloaded = Rc::new(CombinedState::new().with_slice("count", "not a number"));

        let err = reducer.reduce(Some(preloaded), Envelope::Init).unwrap_err();
        assert!(matches!(err, StoreError::SliceTypeMismatch { ref key, .. } if key == "count"));
    }

    #[test]
    fn test_unexpected_keys_dropped_on_change() {
        let reducer = combine_reducers_with(
            ReducerMap::new().slice("count", counter),
            CombineConfig::production(),
        );
        let preloaded = Rc::new(CombinedState::new().with_slice("count", 5).with_slice("stale", true));

        // No slice changed: the incoming aggregate (stale key included) is kept
        let same = reducer
            .reduce(Some(preloaded.clone()), Envelope::Init)
            .unwrap()
            .unwrap();
        assert!(Rc::ptr_eq(&preloaded, &same));

        let next = reducer
            .reduce(Some(same), Envelope::Action(&TestAction::Increment))
            .unwrap()
            .unwrap();
        assert_eq!(next.get::<i32>("count"), Some(&6));
        assert!(!next.contains_key("stale"));
    }

    #[test]
    fn test_nested_combination() {
        let inner = combined();
        let outer = combine_reducers(ReducerMap::new().slice("inner", inner));

        let state = outer.reduce(None, Envelope::Init).unwrap().unwrap();
        let inner_state = state.slice::<CombinedState>("inner").unwrap();
        assert_eq!(inner_state.get::<i32>("count"), Some(&0));

        let next = outer
            .reduce(Some(state), Envelope::Action(&TestAction::Increment))
            .unwrap()
            .unwrap();
        assert_eq!(
            next.slice::<CombinedState>("inner")
                .unwrap()
                .get::<i32>("count"),
            Some(&1)
        );
    }

    // Diagnostics are captured through a tracing subscriber writing into a buffer

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn with_captured_logs(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn test_unexpected_key_warned_once_per_key() {
        let logs = with_captured_logs(|| {
            let reducer = combine_reducers_with(
                ReducerMap::new().slice("count", counter),
                CombineConfig::diagnostic(),
            );
            // Nothing changes, so the stale key survives into later calls
            let preloaded = Rc::new(
                CombinedState::new()
                    .with_slice("count", 0)
                    .with_slice("stale", 1u8),
            );
            let state = reducer.reduce(Some(preloaded), Envelope::Init).unwrap().unwrap();
            assert!(state.contains_key("stale"));
            let state = reducer
                .reduce(Some(state), Envelope::Probe("@@reduct/PROBE_UNKNOWN_ACTION_a"))
                .unwrap()
                .unwrap();
            let _ = reducer.reduce(Some(state), Envelope::Init).unwrap();
        });

        assert_eq!(logs.matches("Unexpected key \"stale\"").count(), 1);
        assert!(logs.contains("preloaded state passed to the store"));
    }

    #[test]
    fn test_missing_reducer_and_empty_map_warnings() {
        let logs = with_captured_logs(|| {
            let missing: Option<NameReducer> = None;
            let reducer = combine_reducers_with(
                ReducerMap::new().maybe_slice("ghost", missing),
                CombineConfig::diagnostic(),
            );
            let _ = reducer.reduce(None, Envelope::Init).unwrap();
        });

        assert!(logs.contains("No reducer provided for key \"ghost\""));
        assert!(logs.contains("Store does not have a valid reducer"));
    }

    #[test]
    fn test_production_mode_is_silent() {
        let logs = with_captured_logs(|| {
            let reducer = combine_reducers_with(
                ReducerMap::new().slice("count", counter),
                CombineConfig::production(),
            );
            let preloaded = Rc::new(CombinedState::new().with_slice("stale", 1u8));
            let _ = reducer.reduce(Some(preloaded), Envelope::Init).unwrap();
        });

        assert!(logs.is_empty());
    }
}
