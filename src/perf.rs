//! Start-up timing and an optional event log file.
//!
//! Both are off by default; nothing here reads the clock until enabled.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOGGER: LazyLock<Mutex<DebugLogger>> =
    LazyLock::new(|| Mutex::new(DebugLogger::default()));

/// Reports its lifetime when dropped, if timing is enabled.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Option<Instant>,
}

impl Drop for Scope {
    fn drop(&mut self) {
        let Some(start) = self.start else {
            return;
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(scope = self.name, elapsed_ms, "perf");
        log_event(self.name, format!("{elapsed_ms:.2} ms"));
    }
}

#[derive(Debug, Default)]
struct DebugLogger {
    start: Option<Instant>,
    writer: Option<BufWriter<File>>,
}

fn logger() -> MutexGuard<'static, DebugLogger> {
    DEBUG_LOGGER.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: is_enabled().then(Instant::now),
    }
}

/// Route [`log_event`] output to `path`, or stop logging with `None`.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut logger = logger();
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writeln!(writer, "notebridge bootstrap debug log start")?;
            writer.flush()?;
            logger.start = Some(Instant::now());
            logger.writer = Some(writer);
        }
        None => {
            logger.start = None;
            logger.writer = None;
        }
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    logger().writer.is_some()
}

pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut logger = logger();
    let Some(start) = logger.start else {
        return;
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    if let Some(writer) = logger.writer.as_mut() {
        let _ = writeln!(
            writer,
            "[{elapsed_ms:>10.3} ms] {name}: {}",
            detail.as_ref()
        );
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_set_enabled_toggles_runtime_flag() {
        set_enabled(true);
        assert!(is_enabled());
        assert!(scope("test.on").start.is_some());

        set_enabled(false);
        assert!(!is_enabled());
        assert!(scope("test.off").start.is_none());
    }

    #[test]
    fn test_debug_log_path_enables_logging_and_writes() {
        let temp_file = NamedTempFile::new().unwrap();
        set_debug_log_path(Some(temp_file.path())).unwrap();
        assert!(is_debug_log_enabled());
        log_event("bootstrap.stage", "Unstarted -> ModuleLoading");
        set_debug_log_path(None).unwrap();
        assert!(!is_debug_log_enabled());
        log_event("bootstrap.stage", "dropped");

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("notebridge bootstrap debug log start"));
        assert!(content.contains("bootstrap.stage: Unstarted -> ModuleLoading"));
        assert!(!content.contains("dropped"));
    }
}
