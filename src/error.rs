//! Unified error type.

use thiserror::Error;

/// The error type returned by tsu-ops' fallible operations.
///
/// Handler failures are not expressed here: the exception logger passes the
/// handler's own error type through untouched. This type covers the host
/// (binding, accepting) and the document reporter (opening, extracting,
/// writing the report).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("pdf: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("page {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
