//! Todo list demonstrating reduct patterns
//!
//! Shows:
//! - Combining slice reducers into one store
//! - Middleware: logging, an action log, and thunks
//! - Listeners observing state changes
//!
//! Run with: `cargo run -p todos -- milk eggs --toggle 0 --filter active --debug`

mod action;
mod reducer;
mod state;
mod thunks;

use std::process::ExitCode;

use clap::Parser;
use reduct::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::action::TodoAction;
use crate::state::{visible_todos, Filter, Todo, TODOS};

/// Todos - reduct framework example
#[derive(Parser, Debug)]
#[command(name = "todos")]
#[command(about = "A todo list demonstrating reduct patterns")]
struct Args {
    /// Todo items to add
    items: Vec<String>,

    /// Toggle the todo at this index (repeatable)
    #[arg(long, short)]
    toggle: Vec<usize>,

    /// Remove completed todos before printing
    #[arg(long)]
    clear_completed: bool,

    /// Which todos to print
    #[arg(long, short, value_enum, default_value_t = Filter::All)]
    filter: Filter,

    /// Enable debug logging and print the action log as JSON
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> reduct::Result<()> {
    let logger = ActionLoggerMiddleware::recording(64, ActionFilter::all()).active(args.debug);

    let store = Store::builder(reducer::root())
        .enhancer(apply_middleware(vec![
            Box::new(LoggingMiddleware::new()),
            Box::new(logger.clone()),
            Box::new(ThunkMiddleware),
        ]))
        .build()?;

    let weak = store.downgrade();
    let subscription = store.subscribe(move || {
        if let Some(store) = weak.upgrade() {
            let state = store.state();
            let count = state.get::<Vec<Todo>>(TODOS).map_or(0, Vec::len);
            tracing::debug!(count, "State updated");
        }
    });

    store.dispatch_thunk(thunks::add_all(args.items))?;
    for index in args.toggle {
        store.dispatch(TodoAction::Toggle(index))?;
    }
    if args.clear_completed {
        store.dispatch(TodoAction::ClearCompleted)?;
    }
    store.dispatch(TodoAction::SetFilter(args.filter))?;
    subscription.unsubscribe();

    let state = store.state();
    for (index, todo) in visible_todos(&state) {
        let mark = if todo.done { 'x' } else { ' ' };
        println!("{index:>3} [{mark}] {}", todo.text);
    }

    if args.debug {
        if let Some(history) = logger.history() {
            match history.to_json() {
                Ok(json) => eprintln!("{json}"),
                Err(e) => tracing::warn!("Could not export action log: {}", e),
            }
        }
    }
    Ok(())
}
