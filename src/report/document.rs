//! Document handles.
//!
//! The reporter only needs four things from a document, captured by the
//! [`Document`] trait. [`PdfDocument`] provides them on top of `lopdf`.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Object};
use tracing::debug;

use crate::error::{Error, Result};

/// An open document supporting page count, metadata, per-page text and close.
pub trait Document {
    fn page_count(&self) -> usize;

    /// Metadata fields, keyed by name.
    fn metadata(&self) -> BTreeMap<String, String>;

    /// Extracted text of the page at `index` (0-based).
    fn page_text(&self, index: usize) -> Result<String>;

    /// Releases the handle.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// A PDF loaded into memory with `lopdf`.
pub struct PdfDocument {
    inner: lopdf::Document,
    /// Page numbers as `lopdf` knows them, in document order.
    pages: Vec<u32>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = lopdf::Document::load(path)?;
        let pages: Vec<u32> = inner.get_pages().into_keys().collect();
        debug!(path = %path.display(), pages = pages.len(), "opened pdf");
        Ok(Self { inner, pages })
    }

    fn info(&self) -> Option<&Dictionary> {
        match self.inner.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.inner.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        let Some(info) = self.info() else {
            return BTreeMap::new();
        };
        info.iter()
            .map(|(key, value)| (String::from_utf8_lossy(key).into_owned(), describe(value)))
            .collect()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let page = *self.pages.get(index).ok_or(Error::PageOutOfRange {
            index,
            count: self.pages.len(),
        })?;
        Ok(self.inner.extract_text(&[page])?)
    }

    fn close(self) -> Result<()> {
        debug!(pages = self.pages.len(), "closed pdf");
        Ok(())
    }
}

/// Renders an Info dictionary value as text.
fn describe(value: &Object) -> String {
    match value {
        Object::String(bytes, _) => decode_text_string(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        Object::Integer(n) => n.to_string(),
        Object::Boolean(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

/// Decodes a PDF text string: UTF-16BE or UTF-8 when a byte-order mark says
/// so, otherwise one byte per character.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    }
}
