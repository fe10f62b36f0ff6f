//! Page text for narration.
//!
//! [`TextSource`] is the boundary to whatever turns a document into page
//! text. [`PdfTextSource`] runs the bundled Python extractor; tests use an
//! in-memory source.

pub mod pdf;

use std::path::PathBuf;

use log::info;
use thiserror::Error;

pub use pdf::{ExtractorConfig, PdfTextSource};

/// Keywords that usually open the body of a book.
pub const INTRO_KEYWORDS: &[&str] = &[
    "introduction",
    "preface",
    "foreword",
    "prologue",
    "about this book",
];

/// Introductions are only looked for near the front of the document.
pub const INTRO_SEARCH_PAGES: usize = 50;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to launch extractor: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("extractor failed: {0}")]
    ScriptFailed(String),
    #[error("extractor output is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
}

/// Text of a page range plus the page count of the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub total_pages: usize,
}

pub trait TextSource: Send + Sync {
    /// Concatenated text of pages `[start, end)`; `end` defaults to the page count.
    fn extract(
        &self,
        document: &str,
        start: usize,
        end: Option<usize>,
    ) -> Result<ExtractedText, ExtractionError>;

    fn page_count(&self, document: &str) -> Result<usize, ExtractionError>;

    /// First page whose lowercased text contains any of `keywords`, looking
    /// at no more than `page_limit` pages.
    fn find_keyword(
        &self,
        document: &str,
        keywords: &[&str],
        page_limit: Option<usize>,
    ) -> Result<Option<usize>, ExtractionError>;
}

/// Joins page texts the way narration hears them: a `Page N.` marker
/// (1-based) before each page.
pub fn join_pages<'a, I>(first_page: usize, pages: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut text = String::new();
    for (offset, page) in pages.into_iter().enumerate() {
        text.push_str(&format!("\nPage {}.\n", first_page + offset + 1));
        text.push_str(page);
    }
    text
}

/// Case-insensitive search over already extracted pages.
pub fn find_in_pages<'a, I>(pages: I, keywords: &[&str], page_limit: Option<usize>) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    pages
        .into_iter()
        .take(page_limit.unwrap_or(usize::MAX))
        .position(|page| {
            let page = page.to_lowercase();
            keywords.iter().any(|keyword| page.contains(keyword.as_str()))
        })
}

pub fn find_introduction(
    source: &dyn TextSource,
    document: &str,
) -> Result<Option<usize>, ExtractionError> {
    let found = source.find_keyword(document, INTRO_KEYWORDS, Some(INTRO_SEARCH_PAGES))?;
    match found {
        Some(page) => info!("Introduction found on page {}", page + 1),
        None => info!("No introduction keyword in the first {INTRO_SEARCH_PAGES} pages"),
    }
    Ok(found)
}

pub fn search_chapter(
    source: &dyn TextSource,
    document: &str,
    chapter: &str,
) -> Result<Option<usize>, ExtractionError> {
    let chapter = chapter.trim();
    if chapter.is_empty() {
        return Ok(None);
    }
    source.find_keyword(document, &[chapter], None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    #[test]
    fn joins_pages_with_markers() {
        let text = join_pages(2, ["Alpha.", "Beta."]);
        assert_eq!(text, "\nPage 3.\nAlpha.\nPage 4.\nBeta.");
    }

    #[test]
    fn keyword_search_is_case_insensitive() {
        let pages = ["Contents", "PREFACE to the reader", "Chapter One"];
        assert_eq!(find_in_pages(pages, &["preface"], None), Some(1));
        assert_eq!(find_in_pages(pages, &["chapter one"], None), Some(2));
        assert_eq!(find_in_pages(pages, &["epilogue"], None), None);
    }

    #[test]
    fn keyword_search_honours_page_limit() {
        let pages = ["a", "b", "c", "Introduction"];
        assert_eq!(find_in_pages(pages, INTRO_KEYWORDS, Some(3)), None);
        assert_eq!(find_in_pages(pages, INTRO_KEYWORDS, Some(4)), Some(3));
    }

    #[test]
    fn introduction_is_searched_in_the_first_pages_only() {
        let mut pages = vec!["filler".to_string(); INTRO_SEARCH_PAGES];
        pages.push("Introduction".into());
        let source = FakeSource::new(pages);
        assert_eq!(find_introduction(&source, "book.pdf").unwrap(), None);

        let source = FakeSource::new(vec!["Title".into(), "About This Book".into()]);
        assert_eq!(find_introduction(&source, "book.pdf").unwrap(), Some(1));
    }

    #[test]
    fn chapter_search_scans_every_page() {
        let mut pages = vec!["filler".to_string(); 80];
        pages.push("Chapter 12: The Storm".into());
        let source = FakeSource::new(pages);
        assert_eq!(
            search_chapter(&source, "book.pdf", "chapter 12").unwrap(),
            Some(80)
        );
        assert_eq!(search_chapter(&source, "book.pdf", "  ").unwrap(), None);
    }
}
