use thiserror::Error;

pub const CONTROLS_HELP: &str = "Controls: p = pause/resume, s = stop, b = bookmark, \
n = next 5 pages, j = jump to page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Stop,
    Bookmark,
    Next,
    /// Followed by a line holding a 1-based page number.
    Jump,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid input. Please enter a number.")]
    MalformedInput(String),
}

/// Unknown input maps to `None` and is ignored by the session.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "p" => Some(Command::TogglePause),
        "s" => Some(Command::Stop),
        "b" => Some(Command::Bookmark),
        "n" => Some(Command::Next),
        "j" => Some(Command::Jump),
        _ => None,
    }
}

/// Parses a 1-based page number into a zero-based index. Range checks are
/// left to the controller, which knows the page count.
pub fn parse_page_number(line: &str) -> Result<i64, ProtocolError> {
    let trimmed = line.trim();
    trimmed
        .parse::<i64>()
        .map(|page| page - 1)
        .map_err(|_| ProtocolError::MalformedInput(trimmed.to_string()))
}
