use std::path::Path;

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Starts file logging under `log_dir`. `RUST_LOG` wins over `level`.
///
/// Only warnings are mirrored to stderr so the interactive prompts on stdout
/// stay readable. Calling this more than once is a no-op.
pub fn init(log_dir: &Path, level: &str) -> anyhow::Result<()> {
    LOGGER.get_or_try_init(|| -> anyhow::Result<LoggerHandle> {
        std::fs::create_dir_all(log_dir)?;
        let handle = Logger::try_with_env_or_str(level)?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename("reader")
                    .suffix("log")
                    .suppress_timestamp(),
            )
            .rotate(
                Criterion::Size(5_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(5),
            )
            .duplicate_to_stderr(Duplicate::Warn)
            .start()?;
        Ok(handle)
    })?;
    Ok(())
}
