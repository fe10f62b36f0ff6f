use std::{ffi::OsString, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use crate::{
    audio::{AudioPlayer, NarrationSink, PiperConfig, PiperSink},
    bookmarks::{JsonBookmarkStore, PositionStore},
    source::{ExtractorConfig, PdfTextSource, TextSource},
    util::{piper_path, runtime},
    voices::VoiceLibrary,
};

/// Resolved configuration, filled from the command line and `READER_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bookmarks: PathBuf,
    pub pdf_script: PathBuf,
    pub python: OsString,
    pub piper_command: Option<String>,
    pub runtime_dir: Option<PathBuf>,
    pub voices_dir: PathBuf,
    pub voice: Option<String>,
    pub length_scale: f32,
    pub volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let extractor = ExtractorConfig::default();
        Self {
            bookmarks: PathBuf::from("bookmarks.json"),
            pdf_script: extractor.script,
            python: extractor.python,
            piper_command: None,
            runtime_dir: None,
            voices_dir: PathBuf::from("assets/voices"),
            voice: None,
            length_scale: 1.0,
            volume: 0.9,
        }
    }
}

/// The three collaborators the playback controller is built from.
pub struct AppState {
    pub source: Arc<dyn TextSource>,
    pub sink: Arc<dyn NarrationSink>,
    pub store: Arc<dyn PositionStore>,
}

impl AppState {
    pub fn initialise(settings: &Settings) -> Result<Self> {
        let source = PdfTextSource::new(ExtractorConfig {
            python: settings.python.clone(),
            script: settings.pdf_script.clone(),
        });

        let voices = VoiceLibrary::scan(settings.voices_dir.clone());
        let voice = voices.select(settings.voice.as_deref()).with_context(|| {
            format!(
                "no usable Piper voice in {}",
                voices.base_dir().display()
            )
        })?;
        info!("Using voice {} ({})", voice.label, voice.model_path.display());

        let runtime_dir = runtime::runtime_dir(settings.runtime_dir.as_deref());
        let command = piper_path::resolve(&runtime_dir, settings.piper_command.as_deref())
            .context("failed to locate Piper")?;
        let sink = PiperSink::new(
            PiperConfig {
                command,
                model_path: voice.model_path,
                speaker: None,
                length_scale: Some(settings.length_scale),
            },
            AudioPlayer::new(settings.volume),
        )
        .context("failed to initialise audio output")?;

        Ok(Self {
            source: Arc::new(source),
            sink: Arc::new(sink),
            store: Arc::new(JsonBookmarkStore::new(settings.bookmarks.clone())),
        })
    }
}
