//! Document structure report.
//!
//! One pass over one document, printed as five sections:
//!
//! | Section | Content |
//! |---|---|
//! | Header | file path, page count, metadata |
//! | First page | up to `sample_chars` characters of page 1 |
//! | Achievement codes | unique codes from the first `scan_pages` pages, at most `max_codes` |
//! | Page lengths | character count of each of the first `length_pages` pages |
//! | Footer | completion banner |
//!
//! Everything is collected before anything is written, so a document that
//! fails half-way prints nothing but the caller's error line.

mod codes;
mod document;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;

pub use codes::{CodeSample, CodeScan, find_codes, scan};
pub use document::{Document, PdfDocument};

const BANNER: &str = "============================================================";

/// Limits applied by the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub sample_chars: usize,
    pub scan_pages: usize,
    pub max_codes: usize,
    pub length_pages: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { sample_chars: 800, scan_pages: 50, max_codes: 10, length_pages: 10 }
    }
}

/// Text length of one page. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLength {
    pub page: usize,
    pub chars: usize,
}

/// Facts collected from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub path: String,
    pub page_count: usize,
    pub metadata: BTreeMap<String, String>,
    pub first_page_sample: String,
    pub codes: Vec<String>,
    pub pages_scanned: usize,
    pub page_lengths: Vec<PageLength>,
}

impl DocumentReport {
    pub fn collect<D>(path: &Path, doc: &D, config: &ReportConfig) -> Result<Self>
    where
        D: Document + ?Sized,
    {
        let page_count = doc.page_count();

        // Pages needed by the sample and the length table are extracted once
        // and shared with the code scan.
        let texts = (0..config.length_pages.max(1).min(page_count))
            .map(|index| doc.page_text(index))
            .collect::<Result<Vec<_>>>()?;

        let first_page_sample: String = texts
            .first()
            .map(|text| text.chars().take(config.sample_chars).collect())
            .unwrap_or_default();

        let CodeScan { codes, pages_scanned } = codes::scan_texts(
            config.scan_pages.min(page_count),
            config.max_codes,
            |index| match texts.get(index) {
                Some(text) => Ok(Cow::Borrowed(text.as_str())),
                None => doc.page_text(index).map(Cow::Owned),
            },
        )?;
        debug!(codes = codes.len(), pages_scanned, "achievement code scan finished");

        let page_lengths = texts
            .iter()
            .take(config.length_pages)
            .enumerate()
            .map(|(index, text)| PageLength { page: index + 1, chars: text.chars().count() })
            .collect();

        Ok(Self {
            path: path.display().to_string(),
            page_count,
            metadata: doc.metadata(),
            first_page_sample,
            codes,
            pages_scanned,
            page_lengths,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W, config: &ReportConfig) -> Result<()> {
        writeln!(out, "{BANNER}")?;
        writeln!(out, "Document structure report")?;
        writeln!(out, "{BANNER}")?;
        writeln!(out, "File: {}", self.path)?;
        writeln!(out, "Pages: {}", self.page_count)?;
        writeln!(out, "Metadata:")?;
        if self.metadata.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for (key, value) in &self.metadata {
            writeln!(out, "  {key}: {value}")?;
        }

        writeln!(out)?;
        writeln!(out, "--- First page text (first {} chars) ---", config.sample_chars)?;
        writeln!(out, "{}", self.first_page_sample)?;

        writeln!(out)?;
        writeln!(out, "--- Achievement codes (first {} pages) ---", config.scan_pages)?;
        if self.codes.is_empty() {
            writeln!(out, "(none found)")?;
        }
        for (i, code) in self.codes.iter().enumerate() {
            writeln!(out, "{}. {code}", i + 1)?;
        }

        writeln!(out)?;
        writeln!(out, "--- Text length per page (first {} pages) ---", config.length_pages)?;
        for PageLength { page, chars } in &self.page_lengths {
            writeln!(out, "Page {page}: {chars} chars")?;
        }

        writeln!(out)?;
        writeln!(out, "{BANNER}")?;
        writeln!(out, "Analysis complete")?;
        writeln!(out, "{BANNER}")?;
        Ok(())
    }
}

/// Opens the PDF at `path`, collects its report, closes it and writes the
/// report to `out`.
pub fn run<W: Write>(path: &Path, config: &ReportConfig, out: &mut W) -> Result<()> {
    let doc = PdfDocument::open(path)?;
    let report = DocumentReport::collect(path, &doc, config)?;
    doc.close()?;

    info!(
        path = %report.path,
        pages = report.page_count,
        codes = report.codes.len(),
        "document analysed"
    );
    report.write_to(out, config)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::Error;

    /// In-memory document that remembers which pages were read.
    struct Pages {
        pages: Vec<String>,
        /// Extraction count per page index.
        touched: RefCell<BTreeMap<usize, usize>>,
    }

    impl Pages {
        fn new<S: Into<String>>(pages: impl IntoIterator<Item = S>) -> Self {
            Self { pages: pages.into_iter().map(Into::into).collect(), touched: RefCell::default() }
        }
    }

    impl Document for Pages {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn metadata(&self) -> BTreeMap<String, String> {
            BTreeMap::from([("Title".to_owned(), "교육과정".to_owned())])
        }

        fn page_text(&self, index: usize) -> Result<String> {
            *self.touched.borrow_mut().entry(index).or_default() += 1;
            self.pages
                .get(index)
                .cloned()
                .ok_or(Error::PageOutOfRange { index, count: self.pages.len() })
        }

        fn close(self) -> Result<()> {
            Ok(())
        }
    }

    fn collect(doc: &Pages) -> DocumentReport {
        DocumentReport::collect(Path::new("x.pdf"), doc, &ReportConfig::default()).unwrap()
    }

    fn render(doc: &Pages) -> String {
        let config = ReportConfig::default();
        let report = DocumentReport::collect(Path::new("plan.pdf"), doc, &config).unwrap();
        let mut out = Vec::new();
        report.write_to(&mut out, &config).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn codes_listed_in_first_seen_order_without_duplicates() {
        let doc = Pages::new([
            "단원 1 [가123-45] 복습 [가123-45]",
            "단원 2 [나999-01] 그리고 다시 [가123-45]",
            "정리",
        ]);

        let out = render(&doc);
        let section: Vec<_> = out
            .lines()
            .skip_while(|l| !l.starts_with("--- Achievement codes"))
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(section, ["1. [가123-45]", "2. [나999-01]"]);
    }

    #[test]
    fn scan_stops_at_page_limit() {
        let mut pages: Vec<String> = (0..60).map(|_| "no codes here".to_owned()).collect();
        for (i, page) in pages.iter_mut().enumerate().skip(50) {
            *page = format!("[{i}가01-01]");
        }
        let doc = Pages::new(pages);

        let result = scan(&doc, 50, 10).unwrap();
        assert!(result.codes.is_empty());
        assert_eq!(result.pages_scanned, 50);
        assert!(doc.touched.borrow().keys().all(|&i| i < 50));
    }

    #[test]
    fn scan_stops_once_cap_is_reached() {
        let pages: Vec<String> = (0..30).map(|i| format!("[{i}가01-01] [{i}나01-01]")).collect();
        let doc = Pages::new(pages);

        let result = scan(&doc, 50, 10).unwrap();
        assert_eq!(result.codes.len(), 10);
        assert_eq!(result.pages_scanned, 5);
        assert_eq!(result.codes[9], "[4나01-01]");
    }

    #[test]
    fn each_page_is_extracted_once() {
        let pages: Vec<String> = (0..30).map(|i| format!("page {i}")).collect();
        let doc = Pages::new(pages);
        collect(&doc);

        let touched = doc.touched.borrow();
        assert_eq!(touched.len(), 30);
        assert!(touched.values().all(|&count| count == 1), "{touched:?}");
    }

    #[test]
    fn sample_page_is_read_once_without_a_length_table() {
        let doc = Pages::new(["[가1-1]", "[나2-2]"]);
        let config = ReportConfig { length_pages: 0, ..ReportConfig::default() };
        let report = DocumentReport::collect(Path::new("x.pdf"), &doc, &config).unwrap();

        assert_eq!(report.first_page_sample, "[가1-1]");
        assert!(report.page_lengths.is_empty());
        assert_eq!(report.codes, ["[가1-1]", "[나2-2]"]);
        assert_eq!(doc.touched.borrow().values().copied().collect::<Vec<_>>(), [1, 1]);
    }

    #[test]
    fn length_table_is_not_padded() {
        let doc = Pages::new(["abc", "가나다라", ""]);
        let report = collect(&doc);
        assert_eq!(
            report.page_lengths,
            [
                PageLength { page: 1, chars: 3 },
                PageLength { page: 2, chars: 4 },
                PageLength { page: 3, chars: 0 },
            ]
        );
    }

    #[test]
    fn length_table_stops_at_ten_pages() {
        let doc = Pages::new((0..25).map(|i| "x".repeat(i)));
        let report = collect(&doc);
        assert_eq!(report.page_lengths.len(), 10);
        assert_eq!(report.page_lengths[9], PageLength { page: 10, chars: 9 });
    }

    #[test]
    fn first_page_sample_is_cut_on_characters() {
        let doc = Pages::new(["가".repeat(1000)]);
        let report = collect(&doc);
        assert_eq!(report.first_page_sample.chars().count(), 800);

        let short = Pages::new(["short page"]);
        let report = collect(&short);
        assert_eq!(report.first_page_sample, "short page");
    }

    #[test]
    fn empty_document_still_reports() {
        let doc = Pages::new(Vec::<String>::new());
        let out = render(&doc);
        assert!(out.contains("Pages: 0"));
        assert!(out.contains("(none found)"));
        assert!(doc.touched.borrow().is_empty());
    }

    #[test]
    fn sections_appear_in_order() {
        let out = render(&Pages::new(["hello"]));
        let positions: Vec<_> = [
            "Document structure report",
            "File: plan.pdf",
            "Pages: 1",
            "  Title: 교육과정",
            "--- First page text",
            "--- Achievement codes",
            "--- Text length per page",
            "Page 1: 5 chars",
            "Analysis complete",
        ]
        .iter()
        .map(|needle| out.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
