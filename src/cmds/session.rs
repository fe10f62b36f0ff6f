use std::{
    io::{self, BufRead, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
};

use log::{debug, info};

use super::protocol::{parse_command, parse_page_number, Command};
use crate::{
    controller::{ControllerError, PlaybackController, PlaybackState},
    narration::POLL_INTERVAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user stopped playback.
    Stopped,
    /// Narration ran out of text.
    Finished,
    /// Input closed; narration was allowed to play out.
    InputClosed,
}

/// Reads stdin line by line on its own thread so the session can keep
/// watching the narration while the user is idle.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        debug!("stdin closed: {err}");
                        break;
                    }
                }
            }
        });
    if let Err(err) = spawned {
        log::error!("Could not read commands from stdin: {err}");
    }
    rx
}

/// Drives the controller from `lines` until the user stops, narration ends,
/// or input closes.
pub fn run_session<W: Write>(
    controller: &mut PlaybackController,
    lines: &Receiver<String>,
    out: &mut W,
) -> io::Result<SessionEnd> {
    loop {
        if controller.is_finished() {
            controller.wait_for_narration();
            writeln!(out, "Finished reading.")?;
            return Ok(SessionEnd::Finished);
        }

        let line = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Input closed, letting narration finish");
                controller.wait_for_narration();
                return Ok(SessionEnd::InputClosed);
            }
        };

        let Some(command) = parse_command(&line) else {
            continue;
        };
        debug!("Command {command:?}");
        match command {
            Command::TogglePause => match controller.toggle_pause() {
                Ok(PlaybackState::Paused) => writeln!(out, "Paused")?,
                Ok(PlaybackState::Running) => writeln!(out, "Resumed")?,
                Ok(_) => {}
                Err(err) => report(out, controller, &err)?,
            },
            Command::Stop => match controller.stop() {
                Ok(()) => {
                    writeln!(out, "Stopped")?;
                    return Ok(SessionEnd::Stopped);
                }
                Err(err) => report(out, controller, &err)?,
            },
            Command::Bookmark => match controller.bookmark() {
                Ok(page) => writeln!(out, "Bookmark saved at page {}", page + 1)?,
                Err(err) => report(out, controller, &err)?,
            },
            Command::Next => match controller.next_range() {
                Ok(range) => writeln!(out, "Skipping to page {}", range.start_page + 1)?,
                Err(err) => report(out, controller, &err)?,
            },
            Command::Jump => {
                write!(out, "Enter page number: ")?;
                out.flush()?;
                let Ok(answer) = lines.recv() else {
                    continue;
                };
                let page = match parse_page_number(&answer) {
                    Ok(page) => page,
                    Err(err) => {
                        writeln!(out, "{err}")?;
                        continue;
                    }
                };
                match controller.jump(page) {
                    Ok(range) => writeln!(out, "Jumping to page {}", range.start_page + 1)?,
                    Err(err) => report(out, controller, &err)?,
                }
            }
        }
    }
}

fn report<W: Write>(
    out: &mut W,
    controller: &PlaybackController,
    err: &ControllerError,
) -> io::Result<()> {
    match err {
        ControllerError::NotStarted => writeln!(out, "Nothing is playing."),
        ControllerError::InvalidPage { .. } => writeln!(
            out,
            "Invalid page. Must be between 1 and {}",
            controller.total_pages().unwrap_or(0)
        ),
        ControllerError::Persistence(err) => writeln!(out, "Error saving bookmark: {err}"),
        other => writeln!(out, "Error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::PositionStore;
    use crate::testing::{FakeSource, MemoryStore, RecordingSink};
    use std::{sync::Arc, time::Duration};

    struct Fixture {
        source: Arc<FakeSource>,
        sink: Arc<RecordingSink>,
        store: Arc<MemoryStore>,
        controller: PlaybackController,
    }

    fn fixture(pages: usize, sentences: usize, delay_ms: u64) -> Fixture {
        let source = Arc::new(FakeSource::with_sentences(pages, sentences));
        let sink = Arc::new(RecordingSink::slow(Duration::from_millis(delay_ms)));
        let store = Arc::new(MemoryStore::default());
        let controller =
            PlaybackController::new("book.pdf", source.clone(), sink.clone(), store.clone());
        Fixture {
            source,
            sink,
            store,
            controller,
        }
    }

    fn feed(lines: &[&str]) -> (mpsc::Sender<String>, Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        (tx, rx)
    }

    #[test]
    fn runs_commands_until_stop() {
        let mut fx = fixture(10, 40, 5);
        fx.controller.start(0).unwrap();
        let (_tx, rx) = feed(&["x", "p", "p", "j", "3", "b", "s", "b"]);
        let mut out = Vec::new();

        let end = run_session(&mut fx.controller, &rx, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(end, SessionEnd::Stopped);
        assert_eq!(
            out,
            "Paused\nResumed\nEnter page number: Jumping to page 3\nBookmark saved at page 3\nStopped\n"
        );
        assert_eq!(fx.store.get("book.pdf"), 2);
        assert_eq!(fx.controller.state(), PlaybackState::Idle);
        assert_eq!(fx.source.extracted(), vec![(0, None), (2, None)]);
        assert_eq!(fx.sink.max_concurrent(), 1);
    }

    #[test]
    fn invalid_jumps_are_reported_and_ignored() {
        let mut fx = fixture(10, 40, 5);
        fx.controller.start(1).unwrap();
        let (_tx, rx) = feed(&["j", "eleven", "j", "11", "j", "0", "s"]);
        let mut out = Vec::new();

        run_session(&mut fx.controller, &rx, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Invalid input. Please enter a number."));
        assert_eq!(out.matches("Invalid page. Must be between 1 and 10").count(), 2);
        assert_eq!(fx.controller.current_position(), 1);
        assert_eq!(fx.source.extracted().len(), 1);
    }

    #[test]
    fn next_skips_five_pages() {
        let mut fx = fixture(10, 40, 5);
        fx.controller.start(2).unwrap();
        let (_tx, rx) = feed(&["n", "s"]);
        let mut out = Vec::new();

        run_session(&mut fx.controller, &rx, &mut out).unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Skipping to page 8"));
        assert_eq!(fx.controller.current_position(), 7);
    }

    #[test]
    fn ends_when_narration_runs_out() {
        let mut fx = fixture(1, 2, 0);
        fx.controller.start(0).unwrap();
        let (_tx, rx) = feed(&[]);
        let mut out = Vec::new();

        let end = run_session(&mut fx.controller, &rx, &mut out).unwrap();
        assert_eq!(end, SessionEnd::Finished);
        assert_eq!(fx.sink.spoken().len(), 2);
    }

    #[test]
    fn closed_input_lets_narration_finish() {
        let mut fx = fixture(2, 5, 5);
        fx.controller.start(0).unwrap();
        let (tx, rx) = feed(&["b"]);
        drop(tx);
        let mut out = Vec::new();

        let end = run_session(&mut fx.controller, &rx, &mut out).unwrap();
        assert_eq!(end, SessionEnd::InputClosed);
        assert_eq!(fx.sink.spoken().len(), 10);
        assert_eq!(fx.controller.state(), PlaybackState::Stopped);
    }
}
