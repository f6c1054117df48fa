//! Debounced watching of the diagram source file.
//!
//! External edits (another editor saving the file) are fed back into the
//! session as new source text. Writes made by the session itself are
//! recorded so they do not echo back as changes.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period before a burst of file events counts as one change.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches a single file and emits debounced change notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
    /// Text last read from or written to the file.
    last_known: Option<String>,
}

impl FileWatcher {
    /// Create a watcher for `path`.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // OS event paths are canonical; compare against canonical paths.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending_since: None,
            last_known: None,
        })
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Record text the session itself wrote (or loaded) so it is not
    /// reported back as an external change.
    pub fn note_contents(&mut self, text: &str) {
        self.last_known = Some(text.to_string());
    }

    /// New file contents once a debounced change is ready and the text
    /// actually differs from what the session last saw.
    pub fn poll(&mut self) -> Option<String> {
        if !self.take_change_ready() {
            return None;
        }
        let text = match std::fs::read_to_string(&self.target_path) {
            Ok(text) => text,
            Err(err) => {
                // Editors that save by rename briefly remove the file.
                tracing::debug!(path = %self.target_path.display(), error = %err, "reread failed");
                crate::perf::log_event("watcher.read_error", format!("{err}"));
                return None;
            }
        };
        if self.last_known.as_deref() == Some(text.as_str()) {
            crate::perf::log_event("watcher.echo", "contents unchanged");
            return None;
        }
        self.last_known = Some(text.clone());
        Some(text)
    }

    /// Returns true once a debounced file change is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let mut saw_relevant_event = false;
        let mut total_events = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            total_events += 1;
            match event {
                Ok(ev) if self.is_relevant(&ev) => saw_relevant_event = true,
                Ok(_) => {}
                Err(err) => crate::perf::log_event("watcher.error", format!("{err}")),
            }
        }
        if total_events > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!(
                    "total={total_events} relevant={saw_relevant_event} target={}",
                    self.target_path.display()
                ),
            );
        }
        if saw_relevant_event {
            self.pending_since = Some(Instant::now());
        }
        self.debounce_elapsed(Instant::now())
    }

    fn debounce_elapsed(&mut self, now: Instant) -> bool {
        let Some(pending_since) = self.pending_since else {
            return false;
        };
        if now.saturating_duration_since(pending_since) >= self.debounce {
            self.pending_since = None;
            return true;
        }
        false
    }

    fn is_relevant(&self, event: &Event) -> bool {
        if event.kind.is_access() {
            return false;
        }
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event {
            kind,
            paths: vec![path],
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_directory_level_event_is_relevant_for_watched_file() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("flow.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        assert!(watcher.is_relevant(&event(EventKind::Any, canonical_dir)));
    }

    #[test]
    fn test_access_events_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().canonicalize().expect("canonicalize").join("flow.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");
        let access = EventKind::Access(notify::event::AccessKind::Any);
        assert!(!watcher.is_relevant(&event(access, path)));
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        assert_eq!(watch_root_for(Path::new("flow.mmd")), PathBuf::from("."));
    }

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("flow.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let mut watcher = FileWatcher::new(&path, Duration::from_millis(250)).expect("watcher");

        let start = Instant::now();
        watcher.pending_since = Some(start);
        assert!(!watcher.debounce_elapsed(start + Duration::from_millis(249)));
        assert!(watcher.debounce_elapsed(start + Duration::from_millis(250)));
        assert!(!watcher.debounce_elapsed(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_external_edit_is_reported_once() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().canonicalize().expect("canonicalize").join("flow.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let mut watcher = FileWatcher::new(&path, Duration::from_millis(50)).expect("watcher");
        watcher.note_contents("graph TD");

        std::thread::sleep(Duration::from_millis(300));
        std::fs::write(&path, "graph LR\n    A --> B\n").expect("write");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = None;
        while Instant::now() < deadline {
            if let Some(text) = watcher.poll() {
                seen = Some(text);
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(seen.as_deref(), Some("graph LR\n    A --> B\n"));
    }

    #[test]
    fn test_own_write_does_not_echo() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().canonicalize().expect("canonicalize").join("flow.mmd");
        std::fs::write(&path, "graph TD").expect("write");
        let mut watcher = FileWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        watcher.note_contents("graph TD\n");
        std::fs::write(&path, "graph TD\n").expect("write");
        watcher.pending_since = Some(Instant::now() - Duration::from_secs(1));
        assert_eq!(watcher.poll(), None);
    }
}
