use std::path::{Path, PathBuf};

/// Directory holding bundled helpers such as the Piper executable.
pub fn runtime_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        if path.components().next().is_some() {
            return path.to_path_buf();
        }
    }
    PathBuf::from("runtime")
}
