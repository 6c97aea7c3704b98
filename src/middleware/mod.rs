//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. Every middleware here is a pass-through: it
//! observes, it never rewrites what the wrapped handler produced.
//!
//! Built-in middleware:
//! - [`exception_log`] — one `ERROR` record per error or panic that escapes
//!   a handler, then the original failure continues upward unchanged

pub mod exception_log;

pub use exception_log::{ExceptionLogger, RequestContext, log_unhandled};
