use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// How to launch Piper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PiperCommand {
    Executable(PathBuf),
    PythonModule,
    /// Program plus leading arguments, split from a shell-style string.
    Custom(Vec<String>),
}

#[derive(Debug, Error)]
pub enum PiperPathError {
    #[error("Piper command override is empty")]
    EmptyOverride,
    #[error("no Piper executable under {0} and python is not on the PATH")]
    Unavailable(PathBuf),
}

/// Resolves Piper from an explicit command line, then `<runtime>/piper`,
/// then `python -m piper`.
pub fn resolve(runtime_dir: &Path, raw_override: Option<&str>) -> Result<PiperCommand, PiperPathError> {
    if let Some(raw) = raw_override {
        let parts: Vec<String> = shlex::Shlex::new(raw).collect();
        if parts.is_empty() {
            return Err(PiperPathError::EmptyOverride);
        }
        return Ok(PiperCommand::Custom(parts));
    }

    let candidate =
        runtime_dir
            .join("piper")
            .join(if cfg!(windows) { "piper.exe" } else { "piper" });
    if candidate.exists() {
        return Ok(PiperCommand::Executable(candidate));
    }

    if which::which("python").is_ok() {
        return Ok(PiperCommand::PythonModule);
    }

    Err(PiperPathError::Unavailable(runtime_dir.to_path_buf()))
}

pub fn command_to_args(cmd: &PiperCommand) -> (OsString, Vec<OsString>) {
    match cmd {
        PiperCommand::Executable(path) => (path.as_os_str().into(), vec![]),
        PiperCommand::PythonModule => (
            OsString::from("python"),
            vec!["-m".into(), "piper".into()],
        ),
        PiperCommand::Custom(parts) => {
            let mut parts = parts.iter().map(OsString::from);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        }
    }
}
