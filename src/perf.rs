//! Timing scopes and the render/export debug event log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Environment variable naming a debug log file when no flag is given.
pub const DEBUG_LOG_ENV: &str = "MERMAIDPAD_RENDER_DEBUG_LOG";

static ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOGGER: LazyLock<Mutex<DebugLogger>> =
    LazyLock::new(|| Mutex::new(DebugLogger::new()));

/// Timing guard; reports on drop while timing is enabled.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Scope {
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.elapsed_ms();
        tracing::debug!(scope = self.name, elapsed_ms, "perf");
        eprintln!("[perf] {}: {elapsed_ms:.2} ms", self.name);
        log_event(self.name, format!("{elapsed_ms:.2} ms"));
    }
}

#[derive(Debug)]
struct DebugLogger {
    path: Option<PathBuf>,
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl DebugLogger {
    fn new() -> Self {
        Self {
            path: None,
            start: Instant::now(),
            writer: None,
        }
    }
}

// A panic while holding the logger leaves it usable; the log is advisory.
fn logger() -> MutexGuard<'static, DebugLogger> {
    DEBUG_LOGGER.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Start (or stop, with `None`) writing debug events to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut logger = logger();
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writeln!(writer, "mermaidpad render debug log start")?;
            writer.flush()?;
            logger.path = Some(path.to_path_buf());
            logger.start = Instant::now();
            logger.writer = Some(writer);
        }
        None => {
            if let Some(mut writer) = logger.writer.take() {
                let _ = writer.flush();
            }
            logger.path = None;
        }
    }
    Ok(())
}

/// Debug log path from `--render-debug-log`, else [`DEBUG_LOG_ENV`].
pub fn debug_log_path(flag: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(DEBUG_LOG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

pub fn is_debug_log_enabled() -> bool {
    logger().writer.is_some()
}

pub fn debug_log_file() -> Option<PathBuf> {
    logger().path.clone()
}

pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut logger = logger();
    let elapsed_ms = logger.start.elapsed().as_secs_f64() * 1000.0;
    let Some(writer) = logger.writer.as_mut() else {
        return;
    };
    let _ = writeln!(writer, "[{elapsed_ms:>10.3} ms] {name}: {}", detail.as_ref());
    let _ = writer.flush();
}
