//! The background narration thread.
//!
//! A [`NarrationTask`] owns its units and speaks them one at a time through a
//! [`NarrationSink`]. Pause and stop are observed only between units: a unit
//! that has started playing always finishes. While paused the thread sleeps
//! on a condition variable that `resume`/`stop` notify, re-checking at least
//! once per poll interval.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::{audio::NarrationSink, segment::SpeakableUnit};

/// Upper bound on how long a paused task sleeps before re-checking its flags.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct Flags {
    paused: bool,
    stopped: bool,
}

#[derive(Debug, Default)]
struct SignalState {
    flags: Mutex<Flags>,
    changed: Condvar,
}

/// Pause/stop flags shared between the controller and one narration task.
///
/// `stopped` is one-shot: once set it stays set. Every task gets a fresh pair.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSignals {
    inner: Arc<SignalState>,
}

impl PlaybackSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.inner.flags.lock().paused = true;
    }

    pub fn resume(&self) {
        self.inner.flags.lock().paused = false;
        self.inner.changed.notify_all();
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = {
            let mut flags = self.inner.flags.lock();
            flags.paused = !flags.paused;
            flags.paused
        };
        self.inner.changed.notify_all();
        paused
    }

    pub fn stop(&self) {
        self.inner.flags.lock().stopped = true;
        self.inner.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.flags.lock().paused
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.flags.lock().stopped
    }

    /// Blocks while paused. Returns `false` if the task has been stopped.
    pub fn wait_while_paused(&self, interval: Duration) -> bool {
        let mut flags = self.inner.flags.lock();
        while flags.paused && !flags.stopped {
            self.inner.changed.wait_for(&mut flags, interval);
        }
        !flags.stopped
    }
}

pub struct NarrationTask {
    units: Vec<SpeakableUnit>,
    sink: Arc<dyn NarrationSink>,
    signals: PlaybackSignals,
    poll_interval: Duration,
}

impl NarrationTask {
    pub fn new(
        units: Vec<SpeakableUnit>,
        sink: Arc<dyn NarrationSink>,
        signals: PlaybackSignals,
    ) -> Self {
        Self {
            units,
            sink,
            signals,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Speaks every unit in order unless stopped first.
    pub fn run(self) {
        let total = self.units.len();
        let mut spoken = 0;
        let mut failed = 0;
        for unit in self.units {
            if self.signals.is_stopped() || !self.signals.wait_while_paused(self.poll_interval) {
                info!("Narration stopped after {spoken} of {total} units");
                return;
            }
            if let Err(err) = self.sink.speak(unit.as_str()) {
                debug!("Skipping unit that failed to render: {err}");
                failed += 1;
            }
            spoken += 1;
        }
        if failed > 0 {
            warn!("{failed} of {total} units could not be rendered");
        }
        info!("Narration finished ({total} units)");
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("narration".into())
            .spawn(move || self.run())
    }
}
