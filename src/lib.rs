//! Reads documents aloud with interactive playback control.
//!
//! A [`controller::PlaybackController`] narrates a page range on a background
//! thread while the console session feeds it pause, stop, bookmark and
//! navigation commands. Text extraction and speech synthesis sit behind the
//! [`source::TextSource`] and [`audio::NarrationSink`] traits; reading
//! positions are kept by a [`bookmarks::PositionStore`].

pub mod audio;
pub mod bookmarks;
pub mod cmds;
pub mod controller;
pub mod narration;
pub mod segment;
pub mod source;
pub mod state;
pub mod util;
pub mod voices;

#[cfg(test)]
pub(crate) mod testing;
