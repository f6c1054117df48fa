use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::app::effects::{Reporter, save_source};
use crate::app::{App, Message, Model, update};
use crate::notice::Notice;
use crate::pipeline::RenderResult;
use crate::samples::DEFAULT_SOURCE;
use crate::watcher::{DEFAULT_DEBOUNCE, FileWatcher};

/// Quiet period after the last edit before a render starts.
pub(super) const RENDER_DEBOUNCE_MS: u64 = 250;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Collapses a burst of render requests into one render.
pub(super) struct RenderDebouncer {
    delay_ms: u64,
    pending: Option<u64>,
}

impl RenderDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Restart the quiet period at `now_ms`.
    pub(super) const fn queue(&mut self, now_ms: u64) {
        self.pending = Some(now_ms);
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> bool {
        let Some(queued_at) = self.pending else {
            return false;
        };
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl App {
    /// Run the session until `quit` is typed.
    ///
    /// A missing source file is created with the default diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the source file cannot be read or created, or the
    /// share base URL is invalid.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        let source = self.read_or_seed_source()?;
        let mut model = self
            .make_model(&source)
            .context("Invalid share base URL")?;

        let mut watcher = if self.watch_enabled {
            match FileWatcher::new(&self.file_path, DEFAULT_DEBOUNCE) {
                Ok(mut watcher) => {
                    watcher.note_contents(&source);
                    Some(watcher)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "file watching unavailable");
                    model.show_notice(Notice::warning(format!("Watch unavailable: {err}")));
                    None
                }
            }
        } else {
            None
        };

        let commands = spawn_command_reader();
        let (results_tx, results_rx) = mpsc::channel();

        eprintln!(
            "editing {} (type `help` for commands)",
            self.file_path.display()
        );
        self.event_loop(model, &commands, &results_tx, &results_rx, watcher.as_mut());
        Ok(())
    }

    fn read_or_seed_source(&self) -> Result<String> {
        match std::fs::read_to_string(&self.file_path) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::write(&self.file_path, DEFAULT_SOURCE).with_context(|| {
                    format!("Failed to create {}", self.file_path.display())
                })?;
                Ok(DEFAULT_SOURCE.to_string())
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", self.file_path.display()))
            }
        }
    }

    fn event_loop(
        &mut self,
        mut model: Model,
        commands: &Receiver<Message>,
        results_tx: &Sender<RenderResult>,
        results_rx: &Receiver<RenderResult>,
        mut watcher: Option<&mut FileWatcher>,
    ) {
        let start = Instant::now();
        let mut debouncer = RenderDebouncer::new(RENDER_DEBOUNCE_MS);
        let mut reporter = Reporter::default();
        let mut stderr = std::io::stderr();
        let mut input_closed = false;

        // The first render does not wait for the debounce window.
        model.take_render_request();
        model = self.dispatch(model, results_tx, Message::RenderNow);

        loop {
            let first = match commands.recv_timeout(POLL_INTERVAL) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    input_closed = true;
                    std::thread::sleep(POLL_INTERVAL);
                    None
                }
            };

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            model = update(model, Message::Tick(now_ms));

            for msg in first.into_iter().chain(commands.try_iter()) {
                model = self.dispatch(model, results_tx, msg);
            }

            if let Some(text) = watcher.as_deref_mut().and_then(FileWatcher::poll) {
                crate::perf::log_event("app.file_changed", format!("bytes={}", text.len()));
                model = self.dispatch(model, results_tx, Message::SourceChanged(text));
            }

            if model.take_render_request() {
                debouncer.queue(now_ms);
            }
            if debouncer.take_ready(now_ms) {
                model = self.dispatch(model, results_tx, Message::RenderNow);
            }

            for result in results_rx.try_iter() {
                model = self.dispatch(model, results_tx, Message::RenderFinished(Box::new(result)));
            }

            if model.take_save_request() {
                save_source(&mut model, watcher.as_deref_mut());
            }

            if let Err(err) = reporter.report(&model, &mut stderr) {
                tracing::debug!(error = %err, "status output failed");
            }

            // Without a watcher, closed input means nothing can change anymore.
            if model.should_quit || (input_closed && watcher.is_none()) {
                break;
            }
        }
    }

    /// Run `msg` through `update`, then perform its side effects.
    fn dispatch(&mut self, model: Model, results: &Sender<RenderResult>, msg: Message) -> Model {
        crate::perf::log_event("app.message", format!("{msg:?}"));
        let mut model = update(model, msg.clone());
        self.handle_message_side_effects(&mut model, results, &msg);
        model
    }
}

/// Read commands from stdin on a background thread.
///
/// Unknown commands become a warning notice. End of input leaves a watching
/// session running on file changes alone.
fn spawn_command_reader() -> Receiver<Message> {
    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let msg = Message::parse_command(&line).unwrap_or_else(|| {
                    Message::Notify(Notice::warning(format!(
                        "unknown command: {} (type `help`)",
                        line.trim()
                    )))
                });
                if tx.send(msg).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "could not read commands from stdin");
    }
    rx
}
