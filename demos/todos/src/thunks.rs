use reduct::prelude::*;
use reduct::CombinedState;

use crate::action::TodoAction;
use crate::state::{Todo, TODOS};

/// Add each non-blank text that is not already on the list
pub fn add_all(
    texts: Vec<String>,
) -> impl FnOnce(&MiddlewareApi<CombinedState, TodoAction>) -> DispatchResult<TodoAction> {
    move |api: &MiddlewareApi<CombinedState, TodoAction>| {
        for text in texts {
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            let state = api.state()?;
            let exists = state
                .get::<Vec<Todo>>(TODOS)
                .is_some_and(|todos| todos.iter().any(|todo| todo.text == text));
            if exists {
                tracing::info!(%text, "Skipping duplicate todo");
                continue;
            }
            api.dispatch(TodoAction::Add { text })?;
        }
        Ok(None)
    }
}
