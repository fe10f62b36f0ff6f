//! Playback state machine.
//!
//! [`PlaybackController`] owns at most one narration thread at a time. Cheap
//! commands (pause, resume) only flip the shared signals; navigation stops and
//! joins the current thread before a new one is launched for the new range.
//! The current position is page-granular: it is the first page of the range
//! being narrated, whatever sentence the narration has reached.

use std::{io, sync::Arc, thread::JoinHandle, time::Duration};

use log::{error, info, warn};
use thiserror::Error;

use crate::{
    audio::NarrationSink,
    bookmarks::{BookmarkError, PositionStore},
    narration::{NarrationTask, PlaybackSignals, POLL_INTERVAL},
    segment::segment,
    source::{ExtractionError, TextSource},
};

/// Pages skipped forward by the "next" command.
pub const NEXT_RANGE_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Paused,
    /// Stop has been signalled. [`PlaybackController::stop`] joins the
    /// thread before returning, so callers see `Idle` afterwards.
    Stopping,
    Stopped,
}

/// Half-open page interval `[start_page, end_page)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrationRange {
    pub start_page: usize,
    pub end_page: usize,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("narration has not been started")]
    NotStarted,
    #[error("invalid page {page}, the document has {total_pages} pages")]
    InvalidPage { page: i64, total_pages: usize },
    #[error("could not read document: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("could not save bookmark: {0}")]
    Persistence(#[from] BookmarkError),
    #[error("could not start narration thread: {0}")]
    Spawn(#[source] io::Error),
}

struct ActiveNarration {
    range: NarrationRange,
    signals: PlaybackSignals,
    handle: JoinHandle<()>,
}

pub struct PlaybackController {
    document: String,
    source: Arc<dyn TextSource>,
    sink: Arc<dyn NarrationSink>,
    store: Arc<dyn PositionStore>,
    state: PlaybackState,
    current_position: usize,
    total_pages: Option<usize>,
    active: Option<ActiveNarration>,
    poll_interval: Duration,
}

impl PlaybackController {
    pub fn new(
        document: impl Into<String>,
        source: Arc<dyn TextSource>,
        sink: Arc<dyn NarrationSink>,
        store: Arc<dyn PositionStore>,
    ) -> Self {
        Self {
            document: document.into(),
            source,
            sink,
            store,
            state: PlaybackState::Idle,
            current_position: 0,
            total_pages: None,
            active: None,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn current_position(&self) -> usize {
        self.current_position
    }

    /// Known once the first range has been extracted.
    pub fn total_pages(&self) -> Option<usize> {
        self.total_pages
    }

    pub fn current_range(&self) -> Option<NarrationRange> {
        self.active.as_ref().map(|active| active.range)
    }

    /// Running or Paused turn into Stopped once the thread has run out of units.
    pub fn state(&self) -> PlaybackState {
        match (&self.active, self.state) {
            (Some(active), PlaybackState::Running | PlaybackState::Paused)
                if active.handle.is_finished() =>
            {
                PlaybackState::Stopped
            }
            (_, state) => state,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state() == PlaybackState::Stopped
    }

    /// Narrates from `start_page` to the end of the document.
    pub fn start(&mut self, start_page: usize) -> Result<NarrationRange, ControllerError> {
        self.start_range(start_page, None)
    }

    /// Extracts and segments the range, then replaces any current narration.
    ///
    /// Extraction happens first, so a document that cannot be read leaves the
    /// current narration untouched. A start page past the last page is
    /// rejected the same way.
    pub fn start_range(
        &mut self,
        start_page: usize,
        end_page: Option<usize>,
    ) -> Result<NarrationRange, ControllerError> {
        let extracted = self
            .source
            .extract(&self.document, start_page, end_page)
            .map_err(|err| {
                error!("Could not extract {}: {err}", self.document);
                err
            })?;
        if start_page > 0 && start_page >= extracted.total_pages {
            warn!(
                "Page {} is past the end of {} ({} pages)",
                start_page + 1,
                self.document,
                extracted.total_pages
            );
            return Err(ControllerError::InvalidPage {
                page: i64::try_from(start_page).unwrap_or(i64::MAX),
                total_pages: extracted.total_pages,
            });
        }
        let units = segment(&extracted.text);
        let range = NarrationRange {
            start_page,
            end_page: end_page
                .unwrap_or(extracted.total_pages)
                .clamp(start_page, extracted.total_pages),
        };

        self.stop_active();
        self.total_pages = Some(extracted.total_pages);

        let signals = PlaybackSignals::new();
        let unit_count = units.len();
        let handle = NarrationTask::new(units, Arc::clone(&self.sink), signals.clone())
            .with_poll_interval(self.poll_interval)
            .spawn()
            .map_err(ControllerError::Spawn)?;

        self.current_position = start_page;
        self.active = Some(ActiveNarration {
            range,
            signals,
            handle,
        });
        self.state = PlaybackState::Running;
        info!(
            "Narrating pages {}..{} of {} ({unit_count} units)",
            range.start_page + 1,
            range.end_page,
            self.document
        );
        Ok(range)
    }

    pub fn pause(&mut self) -> Result<PlaybackState, ControllerError> {
        self.ensure_started()?;
        if self.state() == PlaybackState::Running {
            if let Some(active) = &self.active {
                active.signals.pause();
                self.state = PlaybackState::Paused;
            }
        }
        Ok(self.state())
    }

    pub fn resume(&mut self) -> Result<PlaybackState, ControllerError> {
        self.ensure_started()?;
        if self.state() == PlaybackState::Paused {
            if let Some(active) = &self.active {
                active.signals.resume();
                self.state = PlaybackState::Running;
            }
        }
        Ok(self.state())
    }

    pub fn toggle_pause(&mut self) -> Result<PlaybackState, ControllerError> {
        match self.state() {
            PlaybackState::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    /// Stops the narration thread and waits for it to exit.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        self.ensure_started()?;
        self.stop_active();
        Ok(())
    }

    /// Saves the current position for this document. Playback is unaffected
    /// if the save fails.
    pub fn bookmark(&mut self) -> Result<usize, ControllerError> {
        self.ensure_started()?;
        self.store
            .save(&self.document, self.current_position)
            .map_err(|err| {
                warn!("Bookmark not saved: {err}");
                err
            })?;
        Ok(self.current_position)
    }

    /// Restarts narration [`NEXT_RANGE_PAGES`] pages further on, clamped to
    /// the last page.
    pub fn next_range(&mut self) -> Result<NarrationRange, ControllerError> {
        let total_pages = self.ensure_started()?;
        let target = (self.current_position + NEXT_RANGE_PAGES).min(total_pages.saturating_sub(1));
        self.start(target)
    }

    /// Restarts narration at a zero-based page.
    pub fn jump(&mut self, page: i64) -> Result<NarrationRange, ControllerError> {
        let total_pages = self.ensure_started()?;
        match usize::try_from(page) {
            Ok(target) if target < total_pages => self.start(target),
            _ => Err(ControllerError::InvalidPage { page, total_pages }),
        }
    }

    /// Lets the current narration play out and joins it.
    pub fn wait_for_narration(&mut self) {
        if let Some(active) = self.active.take() {
            join(active.handle);
            self.state = PlaybackState::Stopped;
        }
    }

    fn ensure_started(&self) -> Result<usize, ControllerError> {
        self.total_pages.ok_or(ControllerError::NotStarted)
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.signals.stop();
            join(active.handle);
            info!("Narration from page {} stopped", active.range.start_page + 1);
        }
        self.state = PlaybackState::Idle;
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop_active();
    }
}

fn join(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("Narration thread panicked");
    }
}
