use std::rc::Rc;

use reduct::prelude::*;

use crate::action::TodoAction;
use crate::state::{Filter, Todo, FILTER, TODOS};

pub fn todos(state: Option<Rc<Vec<Todo>>>, action: Envelope<'_, TodoAction>) -> Option<Rc<Vec<Todo>>> {
    let state = state.unwrap_or_default();
    let Some(action) = action.action() else {
        return Some(state);
    };

    match action {
        TodoAction::Add { text } => {
            let mut next = (*state).clone();
            next.push(Todo::new(text.as_str()));
            Some(Rc::new(next))
        }
        TodoAction::Toggle(index) if *index < state.len() => {
            let mut next = (*state).clone();
            next[*index].done = !next[*index].done;
            Some(Rc::new(next))
        }
        TodoAction::ClearCompleted if state.iter().any(|todo| todo.done) => {
            let next = state.iter().filter(|todo| !todo.done).cloned().collect();
            Some(Rc::new(next))
        }
        _ => Some(state),
    }
}

pub fn filter() -> impl Reducer<Filter, TodoAction> {
    with_initial(Filter::default, |_current: &Filter, action: &TodoAction| match action {
        TodoAction::SetFilter(filter) => Some(*filter),
        _ => None,
    })
}

pub fn root() -> CombinedReducer<TodoAction> {
    combine_reducers(ReducerMap::new().slice(TODOS, todos).slice(FILTER, filter()))
}
