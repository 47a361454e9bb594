use clap::ValueEnum;
use reduct::CombinedState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub text: String,
    pub done: bool,
}

impl Todo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// Which todos are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Filter {
    #[default]
    All,
    Active,
    Done,
}

impl Filter {
    pub fn shows(self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.done,
            Filter::Done => todo.done,
        }
    }
}

pub const TODOS: &str = "todos";
pub const FILTER: &str = "filter";

/// Todos passing the current filter, with their index in the full list
pub fn visible_todos(state: &CombinedState) -> Vec<(usize, &Todo)> {
    let filter = state.get::<Filter>(FILTER).copied().unwrap_or_default();
    state
        .get::<Vec<Todo>>(TODOS)
        .map(|todos| {
            todos
                .iter()
                .enumerate()
                .filter(|(_, todo)| filter.shows(todo))
                .collect()
        })
        .unwrap_or_default()
}
