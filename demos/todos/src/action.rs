use reduct::Action;

use crate::state::Filter;

/// Everything that can happen to the todo list
#[derive(Action, Clone, Debug, PartialEq)]
#[action(rename_all = "snake_case", summary)]
pub enum TodoAction {
    Add { text: String },
    Toggle(usize),
    ClearCompleted,
    SetFilter(Filter),
}
