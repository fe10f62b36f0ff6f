use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice '{0}' not found")]
    NotFound(String),
    #[error("no voice models found under {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    pub id: String,
    pub label: String,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub model_path: PathBuf,
}

/// Piper voice models (`*.onnx`) discovered under a base directory.
pub struct VoiceLibrary {
    base_dir: PathBuf,
    voices: HashMap<String, VoiceInfo>,
}

impl VoiceLibrary {
    pub fn scan(base_dir: PathBuf) -> Self {
        let mut voices = HashMap::new();
        if base_dir.exists() {
            for entry in WalkDir::new(&base_dir).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("onnx") {
                    continue;
                }
                if let Some(info) = build_voice_info(path) {
                    voices.insert(info.id.clone(), info);
                }
            }
        }
        Self { base_dir, voices }
    }

    pub fn list(&self) -> Vec<VoiceInfo> {
        let mut voices: Vec<_> = self.voices.values().cloned().collect();
        voices.sort_by(|a, b| a.label.cmp(&b.label));
        voices
    }

    pub fn get(&self, id: &str) -> Result<VoiceInfo, VoiceError> {
        self.voices
            .get(id)
            .cloned()
            .ok_or_else(|| VoiceError::NotFound(id.to_string()))
    }

    /// The requested voice, or the first one by label when none is requested.
    pub fn select(&self, id: Option<&str>) -> Result<VoiceInfo, VoiceError> {
        match id {
            Some(id) => self.get(id),
            None => self
                .list()
                .into_iter()
                .next()
                .ok_or_else(|| VoiceError::Empty(self.base_dir.clone())),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn build_voice_info(path: &Path) -> Option<VoiceInfo> {
    let id = path.file_stem()?.to_string_lossy().to_string();
    let metadata = metadata_path_for(path).and_then(|meta| match fs::read_to_string(&meta) {
        Ok(contents) => serde_json::from_str::<Value>(&contents)
            .map_err(|err| warn!("Failed to parse metadata {}: {err}", meta.display()))
            .ok(),
        Err(err) => {
            warn!("Failed to read metadata {}: {err}", meta.display());
            None
        }
    });

    let language = metadata.as_ref().and_then(|value| value.get("language"));
    let label = language
        .and_then(|lang| lang.get("name_native").or_else(|| lang.get("name")))
        .and_then(Value::as_str)
        .map(|lang| format!("{lang} · {id}"))
        .unwrap_or_else(|| id.clone());

    Some(VoiceInfo {
        language: language
            .and_then(|lang| lang.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string),
        quality: metadata
            .as_ref()
            .and_then(|value| value.get("audio"))
            .and_then(|audio| audio.get("quality"))
            .and_then(Value::as_str)
            .map(str::to_string),
        id,
        label,
        model_path: path.to_path_buf(),
    })
}

fn metadata_path_for(path: &Path) -> Option<PathBuf> {
    let mut metadata_path = path.to_path_buf();
    metadata_path.set_extension("onnx.json");
    metadata_path.exists().then_some(metadata_path)
}
