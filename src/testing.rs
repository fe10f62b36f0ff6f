//! Test doubles for the three collaborators of the playback controller.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;

use crate::{
    audio::{NarrationSink, SinkError},
    bookmarks::{BookmarkError, Bookmarks, PositionStore},
    source::{find_in_pages, ExtractedText, ExtractionError, TextSource},
};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory pages joined with newlines, without page markers.
pub struct FakeSource {
    pages: Vec<String>,
    extracted: Mutex<Vec<(usize, Option<usize>)>>,
    broken: AtomicBool,
}

impl FakeSource {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            extracted: Mutex::new(Vec::new()),
            broken: AtomicBool::new(false),
        }
    }

    /// `count` pages, each holding `sentences` short sentences.
    pub fn with_sentences(count: usize, sentences: usize) -> Self {
        let pages = (0..count)
            .map(|page| {
                (0..sentences)
                    .map(|n| format!("Page {page} sentence {n}."))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        Self::new(pages)
    }

    pub fn break_document(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn extracted(&self) -> Vec<(usize, Option<usize>)> {
        self.extracted.lock().clone()
    }
}

impl TextSource for FakeSource {
    fn extract(
        &self,
        document: &str,
        start: usize,
        end: Option<usize>,
    ) -> Result<ExtractedText, ExtractionError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ExtractionError::NotFound(PathBuf::from(document)));
        }
        self.extracted.lock().push((start, end));
        let total_pages = self.pages.len();
        let end = end.unwrap_or(total_pages).min(total_pages);
        let text = self
            .pages
            .get(start..end)
            .unwrap_or_default()
            .join("\n");
        Ok(ExtractedText { text, total_pages })
    }

    fn page_count(&self, document: &str) -> Result<usize, ExtractionError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ExtractionError::NotFound(PathBuf::from(document)));
        }
        Ok(self.pages.len())
    }

    fn find_keyword(
        &self,
        document: &str,
        keywords: &[&str],
        page_limit: Option<usize>,
    ) -> Result<Option<usize>, ExtractionError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ExtractionError::NotFound(PathBuf::from(document)));
        }
        Ok(find_in_pages(
            self.pages.iter().map(String::as_str),
            keywords,
            page_limit,
        ))
    }
}

/// Records every unit; optionally slow, optionally failing on one unit.
#[derive(Default)]
pub struct RecordingSink {
    spoken: Mutex<Vec<String>>,
    fail_on: Option<String>,
    delay: Duration,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl RecordingSink {
    pub fn failing_on(text: &str) -> Self {
        Self {
            fail_on: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    /// Largest number of `speak` calls ever in flight at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

impl NarrationSink for RecordingSink {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        self.spoken.lock().push(text.to_string());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        match &self.fail_on {
            Some(fail) if fail == text => Err(SinkError::Other(format!("cannot render {text}"))),
            _ => Ok(()),
        }
    }
}

/// A sink whose every `speak` call blocks until the test releases it.
pub struct GatedSink {
    started_tx: Mutex<Sender<String>>,
    started_rx: Mutex<Receiver<String>>,
    release_tx: Mutex<Sender<()>>,
    release_rx: Mutex<Receiver<()>>,
    calls: AtomicUsize,
}

impl GatedSink {
    pub fn new() -> Self {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        Self {
            started_tx: Mutex::new(started_tx),
            started_rx: Mutex::new(started_rx),
            release_tx: Mutex::new(release_tx),
            release_rx: Mutex::new(release_rx),
            calls: AtomicUsize::new(0),
        }
    }

    /// Waits for the next unit to reach the sink.
    pub fn next_started(&self) -> Option<String> {
        self.started_rx.lock().recv_timeout(TEST_TIMEOUT).ok()
    }

    pub fn release(&self) {
        let _ = self.release_tx.lock().send(());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NarrationSink for GatedSink {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.started_tx.lock().send(text.to_string());
        let _ = self.release_rx.lock().recv_timeout(TEST_TIMEOUT);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    bookmarks: Mutex<Bookmarks>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_saves.store(true, Ordering::SeqCst);
        store
    }
}

impl PositionStore for MemoryStore {
    fn load(&self) -> Bookmarks {
        self.bookmarks.lock().clone()
    }

    fn save(&self, document: &str, page: usize) -> Result<(), BookmarkError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BookmarkError::Io(
                PathBuf::from("bookmarks.json"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.bookmarks.lock().insert(document.to_string(), page);
        Ok(())
    }
}
