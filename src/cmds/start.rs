use std::io::{self, BufRead, Write};

use log::warn;

use crate::{
    bookmarks::PositionStore,
    source::{find_introduction, search_chapter, TextSource},
};

/// Where the first narration range begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPoint {
    Resume,
    Introduction,
    Beginning,
    Chapter(String),
    /// 1-based, as typed by the user.
    Page(i64),
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<String> {
    write!(out, "{question}")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Asks the user where to begin: the saved bookmark when there is one,
/// otherwise the start menu.
pub fn choose_start<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    bookmark: usize,
) -> io::Result<StartPoint> {
    if bookmark > 0 {
        let answer = prompt(
            input,
            out,
            &format!("\nFound bookmark at page {}. Resume? (y/n): ", bookmark + 1),
        )?;
        if answer.eq_ignore_ascii_case("y") {
            return Ok(StartPoint::Resume);
        }
    }

    writeln!(out, "\nWhere would you like to start reading?")?;
    writeln!(out, "1. From the introduction (auto-detect)")?;
    writeln!(out, "2. From the beginning")?;
    writeln!(out, "3. Search for a chapter")?;
    writeln!(out, "4. Specific page number")?;

    let choice = prompt(input, out, "\nEnter your choice (1-4): ")?;
    let point = match choice.as_str() {
        "1" => StartPoint::Introduction,
        "2" => StartPoint::Beginning,
        "3" => StartPoint::Chapter(prompt(input, out, "Enter chapter name: ")?),
        "4" => {
            let page = prompt(input, out, "Enter page number: ")?;
            match page.parse() {
                Ok(page) => StartPoint::Page(page),
                Err(_) => {
                    writeln!(out, "Invalid page number. Starting from beginning.")?;
                    StartPoint::Beginning
                }
            }
        }
        _ => {
            writeln!(out, "Invalid choice. Starting from beginning.")?;
            StartPoint::Beginning
        }
    };
    Ok(point)
}

/// Turns a start point into a zero-based page. Searches that fail or find
/// nothing fall back to the first page.
pub fn resolve_start<W: Write>(
    point: &StartPoint,
    source: &dyn TextSource,
    store: &dyn PositionStore,
    document: &str,
    out: &mut W,
) -> io::Result<usize> {
    let page = match point {
        StartPoint::Resume => {
            let saved = store.get(document);
            let page = clamp_to_document(source, document, saved);
            if page != saved {
                warn!("Bookmark page {} is past the end of {document}", saved + 1);
                writeln!(
                    out,
                    "Bookmark is past the end of the document. Starting from page {}.",
                    page + 1
                )?;
            }
            page
        }
        StartPoint::Beginning => 0,
        StartPoint::Introduction => {
            writeln!(out, "\nSearching for introduction...")?;
            match find_introduction(source, document) {
                Ok(Some(page)) => {
                    writeln!(out, "Found introduction on page {}", page + 1)?;
                    page
                }
                Ok(None) => {
                    writeln!(out, "Introduction not found. Starting from page 1.")?;
                    0
                }
                Err(err) => {
                    warn!("Introduction search failed: {err}");
                    writeln!(out, "Error searching for introduction: {err}")?;
                    0
                }
            }
        }
        StartPoint::Chapter(name) => {
            writeln!(out, "\nSearching for '{name}'...")?;
            match search_chapter(source, document, name) {
                Ok(Some(page)) => {
                    writeln!(out, "Found on page {}", page + 1)?;
                    page
                }
                Ok(None) => {
                    writeln!(out, "Chapter '{name}' not found. Starting from beginning.")?;
                    0
                }
                Err(err) => {
                    warn!("Chapter search failed: {err}");
                    writeln!(out, "Error searching for chapter: {err}")?;
                    0
                }
            }
        }
        StartPoint::Page(page) => {
            let index = usize::try_from(page.saturating_sub(1)).unwrap_or(0);
            clamp_to_document(source, document, index)
        }
    };
    Ok(page)
}

/// Pulls `page` back to the last page. An unreadable document is left for
/// the controller to report.
fn clamp_to_document(source: &dyn TextSource, document: &str, page: usize) -> usize {
    match source.page_count(document) {
        Ok(total_pages) if total_pages > 0 => page.min(total_pages - 1),
        _ => page,
    }
}
