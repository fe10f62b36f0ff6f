use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use log::{debug, error, warn};
use tempfile::TempDir;

use super::{AudioPlayer, NarrationSink, SinkError};
use crate::util::piper_path::{command_to_args, PiperCommand};

#[derive(Debug, Clone)]
pub struct PiperConfig {
    pub command: PiperCommand,
    pub model_path: PathBuf,
    pub speaker: Option<String>,
    pub length_scale: Option<f32>,
}

impl PiperConfig {
    fn build_command(&self, output_path: &Path) -> Result<Command, SinkError> {
        if !self.model_path.exists() {
            return Err(SinkError::VoiceNotFound(self.model_path.clone()));
        }

        let (program, args) = command_to_args(&self.command);
        let mut command = Command::new(program);
        command.args(args);
        command.arg("--model");
        command.arg(&self.model_path);
        command.arg("--output_file");
        command.arg(output_path);
        if let Some(speaker) = &self.speaker {
            command.arg("--speaker");
            command.arg(speaker);
        }
        if let Some(scale) = self.length_scale {
            command.arg("--length_scale");
            command.arg(scale.to_string());
        }
        Ok(command)
    }

    /// Runs Piper once, feeding `text` on stdin, and waits for the WAV file.
    pub fn synthesize(&self, text: &str, output_path: &Path) -> Result<(), SinkError> {
        let start = Instant::now();
        let mut child = self
            .build_command(output_path)?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SinkError::Spawn)?;
        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| SinkError::Other("failed to access Piper stdin".into()))?;
            stdin
                .write_all(text.as_bytes())
                .map_err(|err| SinkError::Other(err.to_string()))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|err| SinkError::Other(err.to_string()))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let status = output.status.code().unwrap_or_default();
            error!("Piper command exited with status {status}: {stderr}");
            return Err(SinkError::Piper { status, stderr });
        }
        if !output_path.exists() {
            warn!(
                "Piper succeeded but the expected output {} was not created",
                output_path.display()
            );
        }
        debug!(
            "Synthesised {} chars in {} ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Speaks each unit by synthesising it with Piper and playing the result.
pub struct PiperSink {
    config: PiperConfig,
    player: AudioPlayer,
    scratch: TempDir,
}

impl PiperSink {
    pub fn new(config: PiperConfig, player: AudioPlayer) -> Result<Self, SinkError> {
        let scratch = tempfile::Builder::new()
            .prefix("reader-audio")
            .tempdir()
            .map_err(|err| SinkError::Io(err.to_string()))?;
        Ok(Self {
            config,
            player,
            scratch,
        })
    }

    fn clip_path(&self) -> PathBuf {
        self.scratch.path().join("unit.wav")
    }
}

impl NarrationSink for PiperSink {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        let clip = self.clip_path();
        self.config.synthesize(text, &clip)?;
        let played = self.player.play_to_end(&clip);
        if let Err(err) = fs::remove_file(&clip) {
            debug!("Could not remove {}: {err}", clip.display());
        }
        played
    }
}
