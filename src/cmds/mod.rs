//! Console front end: the single-letter command protocol, the foreground
//! loop that feeds it to the [`crate::controller::PlaybackController`], and
//! the startup menu that picks the first page.

pub mod protocol;
pub mod session;
pub mod start;

pub use protocol::{parse_command, parse_page_number, Command, ProtocolError};
pub use session::{run_session, spawn_stdin_reader, SessionEnd};
pub use start::{choose_start, resolve_start, StartPoint};
