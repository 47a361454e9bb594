//! End-to-end behavior of the store, combinator and middleware together

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reduct::prelude::*;
use reduct::testing::StoreHarness;
use reduct::{assert_dispatched, assert_not_dispatched};
use serde_json::json;

#[derive(Action, Clone, Debug, PartialEq)]
enum CounterAction {
    #[action(rename = "INC")]
    Inc,
    Rename(String),
    Unknown,
}

fn counter(state: Option<Rc<i32>>, action: Envelope<'_, CounterAction>) -> Option<Rc<i32>> {
    let state = state.unwrap_or_else(|| Rc::new(0));
    match action {
        Envelope::Action(CounterAction::Inc) => Some(Rc::new(*state + 1)),
        _ => Some(state),
    }
}

fn name(state: Option<Rc<String>>, action: Envelope<'_, CounterAction>) -> Option<Rc<String>> {
    let state = state.unwrap_or_else(|| Rc::new("x".to_string()));
    match action {
        Envelope::Action(CounterAction::Rename(to)) => Some(Rc::new(to.clone())),
        _ => Some(state),
    }
}

#[test]
fn test_counter_reaches_two() {
    let store = Store::new(counter).unwrap();
    store.dispatch(CounterAction::Inc).unwrap();
    store.dispatch(CounterAction::Inc).unwrap();
    assert_eq!(*store.state(), 2);
}

#[test]
fn test_combined_initial_state() {
    let root = combine_reducers(ReducerMap::new().slice("count", counter).slice("name", name));
    let store = Store::new(root).unwrap();

    let state = store.state();
    assert_eq!(state.keys().collect::<Vec<_>>(), vec!["count", "name"]);
    assert_eq!(state.get::<i32>("count"), Some(&0));
    assert_eq!(state.get::<String>("name").map(String::as_str), Some("x"));
}

#[test]
fn test_combined_identity_across_dispatches() {
    let root = combine_reducers(ReducerMap::new().slice("count", counter).slice("name", name));
    let store = Store::new(root).unwrap();

    let before = store.state();
    store.dispatch(CounterAction::Unknown).unwrap();
    assert!(Rc::ptr_eq(&before, &store.state()));

    store.dispatch(CounterAction::Inc).unwrap();
    let after = store.state();
    assert!(!Rc::ptr_eq(&before, &after));
    // The untouched slice keeps its identity
    assert!(Rc::ptr_eq(
        &before.slice::<String>("name").unwrap(),
        &after.slice::<String>("name").unwrap()
    ));
}

#[test]
fn test_undefined_slice_names_key_and_type() {
    let picky = |state: Option<Rc<i32>>, action: Envelope<'_, CounterAction>| -> Option<Rc<i32>> {
        match action {
            Envelope::Action(CounterAction::Unknown) => None,
            _ => Some(state.unwrap_or_else(|| Rc::new(0))),
        }
    };
    let store = Store::new(combine_reducers(ReducerMap::new().slice("picky", picky))).unwrap();
    let listener_calls = Rc::new(Cell::new(0));
    let calls = listener_calls.clone();
    store.subscribe(move || calls.set(calls.get() + 1));

    let before = store.state();
    let err = store.dispatch(CounterAction::Unknown).unwrap_err();

    assert_eq!(
        err,
        StoreError::UndefinedSliceState {
            key: "picky".into(),
            action_type: "Unknown".into(),
        }
    );
    assert!(Rc::ptr_eq(&before, &store.state()));
    assert_eq!(listener_calls.get(), 0);
}

#[test]
fn test_thunk_never_reaches_reducer() {
    let reached = Rc::new(RefCell::new(Vec::new()));
    let seen = reached.clone();
    let spy = move |state: Option<Rc<i32>>, action: Envelope<'_, CounterAction>| -> Option<Rc<i32>> {
        seen.borrow_mut().push(action.action_type().to_string());
        counter(state, action)
    };

    let harness = StoreHarness::with_middleware(spy, vec![Box::new(ThunkMiddleware)]).unwrap();
    reached.borrow_mut().clear();

    let result = harness
        .store()
        .dispatch_thunk(|api| {
            if *api.state()? == 0 {
                api.dispatch(CounterAction::Inc)?;
            }
            Ok(None)
        })
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(*harness.state(), 1);
    assert_eq!(*reached.borrow(), vec!["INC"]);

    let actions = harness.drain_dispatched();
    assert_dispatched!(actions, CounterAction::Inc);
    assert_not_dispatched!(actions, CounterAction::Unknown);
}

#[test]
fn test_middleware_order_and_logger() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let tag = |label: &'static str| -> Box<dyn Middleware<i32, CounterAction>> {
        let order = order.clone();
        Box::new(middleware_fn(
            move |_api: &MiddlewareApi<i32, CounterAction>, intent, next: &DispatchFn<i32, CounterAction>| {
                order.borrow_mut().push(label);
                next(intent)
            },
        ))
    };
    let logger = ActionLoggerMiddleware::recording(16, ActionFilter::all());

    let store = Store::builder(counter)
        .enhancer(apply_middleware(vec![
            tag("m1"),
            Box::new(logger.clone()),
            tag("m2"),
        ]))
        .build()
        .unwrap();

    store.dispatch(CounterAction::Inc).unwrap();

    assert_eq!(*order.borrow(), vec!["m1", "m2"]);
    let history = logger.history().unwrap();
    let entry = history.entries().next().unwrap();
    assert_eq!(entry.action_type, "INC");
    assert_eq!(entry.state_changed, Some(true));
}

impl ActionSummary for CounterAction {}

#[test]
fn test_replace_reducer_adds_slice() {
    let store = Store::new(combine_reducers(ReducerMap::new().slice("count", counter))).unwrap();
    store.dispatch(CounterAction::Inc).unwrap();

    store
        .replace_reducer(combine_reducers(
            ReducerMap::new().slice("count", counter).slice("name", name),
        ))
        .unwrap();

    let state = store.state();
    assert_eq!(state.get::<i32>("count"), Some(&1));
    assert_eq!(state.get::<String>("name").map(String::as_str), Some("x"));
}

#[test]
fn test_observable_over_combined_state() {
    let store = Store::new(combine_reducers(ReducerMap::new().slice("count", counter))).unwrap();
    let counts = Rc::new(RefCell::new(Vec::new()));
    let sink = counts.clone();
    store.subscribe_observer(move |state: Rc<CombinedState>| {
        sink.borrow_mut().push(state.get::<i32>("count").copied());
    });

    store.dispatch(CounterAction::Inc).unwrap();
    assert_eq!(*counts.borrow(), vec![Some(0), Some(1)]);
}

fn json_counter(state: Option<Rc<i64>>, action: Envelope<'_, JsonAction>) -> Option<Rc<i64>> {
    let state = state.unwrap_or_else(|| Rc::new(0));
    match action.action() {
        Some(action) if action.name() == "INC" => {
            let by = action.get("by").and_then(|v| v.as_i64()).unwrap_or(1);
            Some(Rc::new(*state + by))
        }
        _ => Some(state),
    }
}

#[test]
fn test_json_actions() {
    let store = Store::new(json_counter).unwrap();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    store.subscribe(move || c.set(c.get() + 1));

    store.dispatch(JsonAction::of_type("INC")).unwrap();
    store
        .dispatch(JsonAction::new(json!({ "type": "INC", "by": 4 })))
        .unwrap();
    assert_eq!(*store.state(), 5);

    let err = store.dispatch(JsonAction::new(json!([1, 2]))).unwrap_err();
    assert!(matches!(err, StoreError::InvalidAction(_)));

    let err = store
        .dispatch(JsonAction::new(json!({ "payload": 1 })))
        .unwrap_err();
    assert_eq!(err, StoreError::MissingActionType);

    // Rejected actions neither reach the reducer nor notify listeners
    assert_eq!(*store.state(), 5);
    assert_eq!(calls.get(), 2);
}
