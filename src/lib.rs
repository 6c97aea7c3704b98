//! # tsu-ops
//!
//! Two small operational utilities for services built the tsu way.
//! They share a crate, not a data flow.
//!
//! ## Unhandled-error logging
//!
//! [`middleware::ExceptionLogger`] wraps a hyper service. When the service
//! returns an error (or panics) it writes one structured `ERROR` record
//! (`request_method`, `request_path`, `request_query`, `exception_type`,
//! plus a backtrace) and hands the failure back unchanged. [`Server`] hosts a
//! service with the logger already installed and answers escaped errors with
//! `500`.
//!
//! ```rust,no_run
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use hyper::service::service_fn;
//! use tsu_ops::Server;
//!
//! #[tokio::main]
//! async fn main() -> tsu_ops::Result<()> {
//!     let app = service_fn(|_req: hyper::Request<hyper::body::Incoming>| async {
//!         Ok::<_, Infallible>(http::Response::new(Full::new(Bytes::from_static(b"ok"))))
//!     });
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```
//!
//! ## Document structure report
//!
//! [`report::run`] opens a PDF and prints its page count, metadata, a sample
//! of the first page, the achievement codes found in its first pages and a
//! per-page text length table. The `docreport` binary is a thin CLI over it.

mod error;
mod server;

pub mod middleware;
pub mod report;

pub use error::{Error, Result};
pub use server::Server;
