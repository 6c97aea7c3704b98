//! Unhandled-error logging.
//!
//! # What happens on failure
//!
//! ```text
//! request ──► ExceptionLogger ──► inner service
//!                                      │
//!             Ok(response)  ◄──────────┤   passed through, nothing logged
//!                                      │
//!             Err(e) / panic ◄─────────┘
//!                  │
//!                  ├─ error!(request_method, request_path, request_query,
//!                  │         exception_type, error, backtrace)
//!                  │
//!                  └─ Err(e) returned / panic resumed, same value
//! ```
//!
//! The record is always written before the failure is handed back, so
//! whatever sits above the logger (the host's 500 response, a test harness,
//! another middleware) observes an event that has already been logged.
//!
//! There is no classification: a validation error and an I/O error are
//! logged the same way. Deciding the final HTTP response is the host's job.

use std::any::{Any, type_name};
use std::backtrace::Backtrace;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;

use futures::FutureExt;
use hyper::service::Service;
use tracing::error;

/// A heap-allocated, type-erased future resolving to the inner service's result.
pub type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

// ── RequestContext ────────────────────────────────────────────────────────────

/// The slice of a request that ends up in the log record.
///
/// Captured before the handler runs, because the handler takes ownership of
/// the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    method: String,
    path: String,
    query: String,
}

impl RequestContext {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self { method: method.into(), path: path.into(), query: query.into() }
    }

    /// Captures method, path and the raw query string (empty when absent).
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        Self::new(
            req.method().as_str(),
            req.uri().path(),
            req.uri().query().unwrap_or_default(),
        )
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn record(&self, type_path: &str, message: &dyn fmt::Display) {
        let exception_type = short_type_name(type_path);
        let backtrace = Backtrace::force_capture();
        error!(
            request_method = %self.method,
            request_path = %self.path,
            request_query = %self.query,
            exception_type = exception_type.as_str(),
            error = %message,
            backtrace = %backtrace,
            "unhandled error while handling {} {}",
            self.method,
            self.path,
        );
    }
}

// ── log_unhandled ─────────────────────────────────────────────────────────────

/// Runs `continuation` and logs any failure that escapes it.
///
/// - `Ok(value)` is returned as is and nothing is logged.
/// - `Err(e)` is logged once with `exception_type` set to the type name of
///   `E`, then the very same `e` is returned.
/// - A panic is logged once with `exception_type` set to the payload type,
///   then resumed with the original payload.
///
/// Type names are logged without module paths (`Error`, not
/// `std::io::error::Error`). A boxed error such as
/// `Box<dyn Error + Send + Sync>` is logged as exactly that: the concrete type
/// behind the box is erased at compile time, so only its message (the
/// `error` field) tells failures apart.
///
/// ```rust
/// # async fn demo() {
/// use tsu_ops::middleware::{RequestContext, log_unhandled};
///
/// let ctx = RequestContext::new("GET", "/users/42", "");
/// let res = log_unhandled(ctx, async { Err::<(), _>(std::fmt::Error) }).await;
/// assert!(res.is_err());
/// # }
/// ```
pub async fn log_unhandled<F, T, E>(ctx: RequestContext, continuation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    // The continuation is only polled again if we resume, and we never do:
    // a caught panic is re-raised immediately.
    match AssertUnwindSafe(continuation).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            ctx.record(type_name::<E>(), &e);
            Err(e)
        }
        Err(payload) => {
            let (kind, message) = describe_panic(payload.as_ref());
            ctx.record(kind, &message);
            panic::resume_unwind(payload)
        }
    }
}

/// Drops the module path from every path inside a type name:
/// `alloc::boxed::Box<dyn core::error::Error>` becomes `Box<dyn Error>`.
fn short_type_name(full: &str) -> String {
    fn push_last_segment(out: &mut String, path: &str) {
        out.push_str(path.rsplit("::").next().unwrap_or(path));
    }

    let mut out = String::with_capacity(full.len());
    let mut start = 0;
    for (i, c) in full.char_indices() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | '*' | ';') {
            push_last_segment(&mut out, &full[start..i]);
            out.push(c);
            start = i + c.len_utf8();
        }
    }
    push_last_segment(&mut out, &full[start..]);
    out
}

/// Payload type and message of a caught panic.
///
/// `panic!("literal")` carries a `&str`, `panic!("{x}")` a `String`; anything
/// else came from `panic_any` and has no readable message.
fn describe_panic(payload: &(dyn Any + Send)) -> (&'static str, String) {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (type_name::<&str>(), (*s).to_owned())
    } else if let Some(s) = payload.downcast_ref::<String>() {
        (type_name::<String>(), s.clone())
    } else {
        (type_name::<Box<dyn Any + Send>>(), "non-string panic payload".to_owned())
    }
}

// ── ExceptionLogger ───────────────────────────────────────────────────────────

/// A hyper [`Service`] wrapper that runs every call through [`log_unhandled`].
///
/// `Response` and `Error` are the inner service's own types, so the logger can
/// be inserted anywhere in a service stack without changing its signature.
#[derive(Debug, Clone)]
pub struct ExceptionLogger<S> {
    inner: S,
}

impl<S> ExceptionLogger<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, B> Service<http::Request<B>> for ExceptionLogger<S>
where
    S: Service<http::Request<B>>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<S::Response, S::Error>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let ctx = RequestContext::from_request(&req);
        let fut = self.inner.call(req);
        Box::pin(log_unhandled(ctx, fut))
    }
}
