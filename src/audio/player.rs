use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use rodio::{Decoder, OutputStream, Sink};

use super::SinkError;

/// Blocking WAV playback on the default output device.
///
/// The output stream is opened per clip: `rodio::OutputStream` is not `Send`,
/// and the player lives on the narration thread.
#[derive(Debug, Clone)]
pub struct AudioPlayer {
    volume: f32,
}

impl AudioPlayer {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn play_to_end(&self, path: &Path) -> Result<(), SinkError> {
        let decoder = open_decoder(path)?;
        let (_stream, handle) = OutputStream::try_default().map_err(|_| SinkError::Device)?;
        let sink = Sink::try_new(&handle).map_err(|err| SinkError::Io(err.to_string()))?;
        sink.set_volume(self.volume);
        sink.append(decoder);
        sink.play();
        debug!("Playing {}", path.display());
        sink.sleep_until_end();
        Ok(())
    }
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new(0.9)
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, SinkError> {
    let file = File::open(path).map_err(|err| SinkError::Io(err.to_string()))?;
    Decoder::new(BufReader::new(file)).map_err(|err| SinkError::Decode(err.to_string()))
}
