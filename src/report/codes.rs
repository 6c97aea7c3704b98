//! Achievement-code scanning.
//!
//! An achievement code is a bracketed curriculum identifier: optional grade
//! digits, a Hangul subject abbreviation, a unit number, a hyphen and an item
//! number, e.g. `[9국01-02]` or `[가123-45]`.

use std::sync::LazyLock;

use regex::Regex;

use super::document::Document;
use crate::error::Result;

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[0-9]*[가-힣]+[0-9]+-[0-9]+\]").expect("achievement code pattern is valid")
});

/// Every achievement code in `text`, in order of appearance.
pub fn find_codes(text: &str) -> impl Iterator<Item = &str> {
    CODE_PATTERN.find_iter(text).map(|m| m.as_str())
}

/// Unique codes in first-seen order, never more than `cap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSample {
    codes: Vec<String>,
    cap: usize,
}

impl CodeSample {
    pub fn with_cap(cap: usize) -> Self {
        Self { codes: Vec::with_capacity(cap), cap }
    }

    /// Adds `code` unless it was already seen or the sample is full.
    /// Returns whether it was added.
    pub fn offer(&mut self, code: &str) -> bool {
        if self.is_full() || self.codes.iter().any(|c| c == code) {
            return false;
        }
        self.codes.push(code.to_owned());
        true
    }

    pub fn is_full(&self) -> bool {
        self.codes.len() >= self.cap
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn into_codes(self) -> Vec<String> {
        self.codes
    }
}

/// Result of [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeScan {
    pub codes: Vec<String>,
    /// How many pages had their text extracted.
    pub pages_scanned: usize,
}

/// Scans pages from the first, up to `max_pages` (or the page count), and
/// stops as soon as `cap` unique codes are held.
pub fn scan<D>(doc: &D, max_pages: usize, cap: usize) -> Result<CodeScan>
where
    D: Document + ?Sized,
{
    scan_texts(max_pages.min(doc.page_count()), cap, |index| doc.page_text(index))
}

/// [`scan`] over pages `0..pages`, reading each page through `page_text`.
pub(crate) fn scan_texts<F, S>(pages: usize, cap: usize, mut page_text: F) -> Result<CodeScan>
where
    F: FnMut(usize) -> Result<S>,
    S: AsRef<str>,
{
    let mut sample = CodeSample::with_cap(cap);
    let mut pages_scanned = 0;

    for index in 0..pages {
        if sample.is_full() {
            break;
        }
        let text = page_text(index)?;
        pages_scanned += 1;
        for code in find_codes(text.as_ref()) {
            sample.offer(code);
            if sample.is_full() {
                break;
            }
        }
    }

    Ok(CodeScan { codes: sample.into_codes(), pages_scanned })
}
