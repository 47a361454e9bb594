//! Action log middleware
//!
//! Traces dispatched actions that pass an [`ActionFilter`] and, when
//! recording, keeps a bounded [`ActionLog`] noting whether each dispatch
//! replaced the state.
//!
//! ```ignore
//! use reduct_core::debug::{ActionFilter, ActionLoggerMiddleware};
//!
//! let logger = ActionLoggerMiddleware::recording(64, ActionFilter::parse(Some("todos/*"), None));
//! let store = Store::builder(reducer)
//!     .enhancer(apply_middleware(vec![Box::new(logger.clone())]))
//!     .build()?;
//!
//! store.dispatch(TodoAction::Toggle(0))?;
//! if let Some(history) = logger.history() {
//!     println!("{}", history.to_json()?);
//! }
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use crate::action::{action_types, ActionSummary};
use crate::middleware::{DispatchFn, Intent, Link, Middleware, MiddlewareApi};

const DEFAULT_CAPACITY: usize = 100;

/// Selects action types by glob pattern (`*` any run, `?` one character).
///
/// An empty include list admits everything; excludes are applied after
/// includes. Reserved store types (`@@reduct/...`) never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ActionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from comma-separated pattern lists, as given on a command line
    ///
    /// ```
    /// use reduct_core::debug::ActionFilter;
    ///
    /// let filter = ActionFilter::parse(Some("todos/*, filter/*"), Some("todos/tick"));
    /// assert!(filter.matches("todos/add"));
    /// assert!(filter.matches("filter/set"));
    /// assert!(!filter.matches("todos/tick"));
    /// assert!(!filter.matches("session/start"));
    /// ```
    pub fn parse(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: include.map(split_patterns).unwrap_or_default(),
            exclude: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    pub fn matches(&self, action_type: &str) -> bool {
        if action_types::is_reserved(action_type) {
            return false;
        }
        let included = self.include.is_empty()
            || self.include.iter().any(|p| glob_match(p, action_type));
        included && !self.exclude.iter().any(|p| glob_match(p, action_type))
    }
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// One dispatched action as seen by the log
#[derive(Debug, Clone)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct LoggedAction {
    /// Position in dispatch order, counting evicted entries
    pub sequence: u64,
    pub action_type: String,
    pub summary: String,
    /// Whether the state was replaced; `None` while in flight or if the
    /// dispatch failed
    pub state_changed: Option<bool>,
    #[cfg_attr(feature = "json", serde(skip))]
    pub dispatched_at: Instant,
}

/// Bounded history of dispatched actions, oldest first
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<LoggedAction>,
    capacity: usize,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Append an entry, evicting the oldest when full.
    ///
    /// Returns the entry's sequence number, or `None` for a zero-capacity log.
    pub fn push(&mut self, action_type: &str, summary: String) -> Option<u64> {
        if self.capacity == 0 {
            return None;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push_back(LoggedAction {
            sequence,
            action_type: action_type.to_string(),
            summary,
            state_changed: None,
            dispatched_at: Instant::now(),
        });
        Some(sequence)
    }

    /// Record the outcome of entry `sequence`; ignored once it was evicted
    pub fn mark(&mut self, sequence: u64, state_changed: bool) {
        // Sequences are contiguous, so the offset from the front locates the entry
        let Some(front) = self.entries.front().map(|entry| entry.sequence) else {
            return;
        };
        let Some(offset) = sequence.checked_sub(front) else {
            return;
        };
        let entry = usize::try_from(offset)
            .ok()
            .and_then(|offset| self.entries.get_mut(offset));
        if let Some(entry) = entry {
            entry.state_changed = Some(state_changed);
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter()
    }

    /// The last `count` entries, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

/// Middleware tracing matching actions at debug level, optionally into a
/// shared [`ActionLog`].
///
/// Clones share the history: keep one to read it after handing another to
/// [`apply_middleware`](crate::apply_middleware).
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    filter: ActionFilter,
    history: Option<Rc<RefCell<ActionLog>>>,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Trace only; no history is kept
    pub fn new(filter: ActionFilter) -> Self {
        Self {
            filter,
            history: None,
            active: true,
        }
    }

    /// Trace and keep the last `capacity` matching actions
    pub fn recording(capacity: usize, filter: ActionFilter) -> Self {
        Self {
            history: Some(Rc::new(RefCell::new(ActionLog::with_capacity(capacity)))),
            ..Self::new(filter)
        }
    }

    /// An inactive logger forwards every intent untouched
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Snapshot of the history, `None` when not recording.
    ///
    /// The snapshot is detached, so it may be held while the store keeps
    /// dispatching.
    pub fn history(&self) -> Option<ActionLog> {
        self.history.as_ref().map(|log| log.borrow().clone())
    }

    fn record<A: ActionSummary>(&self, action: &A) -> Option<u64> {
        let action_type = action.name();
        if !self.filter.matches(action_type) {
            return None;
        }

        let sequence = self
            .history
            .as_ref()
            .and_then(|log| log.borrow_mut().push(action_type, action.summary()));
        tracing::debug!(action = %action_type, ?sequence, "dispatch");
        sequence
    }

    fn mark(&self, sequence: u64, state_changed: bool) {
        if let Some(log) = &self.history {
            log.borrow_mut().mark(sequence, state_changed);
        }
    }
}

impl<S: 'static, A: ActionSummary> Middleware<S, A> for ActionLoggerMiddleware {
    fn link(&self, api: MiddlewareApi<S, A>) -> Link<S, A> {
        let logger = self.clone();
        Box::new(move |next: DispatchFn<S, A>| -> DispatchFn<S, A> {
            let logger = logger.clone();
            let api = api.clone();
            Rc::new(move |intent: Intent<S, A>| {
                let sequence = match &intent {
                    Intent::Action(action) if logger.active => logger.record(action),
                    _ => None,
                };
                let Some(sequence) = sequence else {
                    return next(intent);
                };

                let before = api.state().ok();
                let result = next(intent);
                if result.is_ok() {
                    if let (Some(before), Ok(after)) = (before, api.state()) {
                        logger.mark(sequence, !Rc::ptr_eq(&before, &after));
                    }
                }
                result
            })
        })
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                // Let the last star swallow one more character
                Some((star, from)) => {
                    backtrack = Some((star, from + 1));
                    pi = star + 1;
                    ti = from + 1;
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}
