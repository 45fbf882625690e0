//! File-logging bootstrap. Logs land next to the data files; stderr would
//! corrupt the alternate-screen TUI, so nothing is written to the terminal.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;
use std::path::Path;

const LOG_FILE_BASENAME: &str = "daybook";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Starts rotating file logging under `log_dir`. Idempotent; on failure the
/// process simply runs without logging rather than refusing to start.
pub fn init(log_dir: &Path) {
    let _ = LOGGER.get_or_try_init(|| -> Result<LoggerHandle, ()> {
        std::fs::create_dir_all(log_dir).map_err(|_| ())?;
        Logger::try_with_env_or_str(default_level())
            .map_err(|_| ())?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .start()
            .map_err(|_| ())
    });
}

fn default_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}
