//! Debug and inspection utilities
//!
//! - **Action Logging**: pattern-filtered tracing output plus a bounded
//!   history of recent actions, exportable as JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use reduct::debug::{ActionFilter, ActionLoggerMiddleware};
//!
//! // Record everything but ticks, and only when --debug is passed
//! let logger = ActionLoggerMiddleware::recording(64, ActionFilter::parse(None, Some("*/tick")))
//!     .active(args.debug);
//! let store = Store::builder(reducer)
//!     .enhancer(apply_middleware(vec![Box::new(logger.clone())]))
//!     .build()?;
//! ```

pub mod action_logger;

pub use action_logger::{ActionFilter, ActionLog, ActionLoggerMiddleware, LoggedAction};
