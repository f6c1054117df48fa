use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::app::input::HELP;
use crate::app::{App, Message, Model};
use crate::editor::Editor;
use crate::export::{Destination, ExportJob};
use crate::notice::Notice;
use crate::pipeline::{RenderOutcome, RenderResult};
use crate::preview::ErrorPanel;
use crate::share::link;
use crate::watcher::FileWatcher;

impl App {
    pub(super) fn handle_message_side_effects(
        &mut self,
        model: &mut Model,
        results: &Sender<RenderResult>,
        msg: &Message,
    ) {
        match msg {
            Message::RenderNow => self.spawn_render(model, results),
            Message::RenderFinished(result) => {
                let committed = model.pipeline.latest_ticket() == Some(result.ticket);
                if committed && matches!(result.outcome, RenderOutcome::Success(_)) {
                    self.export_to_output(model);
                }
            }
            Message::Export(format, path) => {
                let destination = path
                    .clone()
                    .map_or(Destination::Clipboard, Destination::File);
                let mut job =
                    ExportJob::new(model.preview.scene(), *format, destination, &model.state);
                job.scale = model.scale;
                let notice = self.exporter.run(&job, &model.state);
                model.show_notice(notice);
            }
            Message::CopyShareLink => {
                let url = model.share_url();
                let done = model.state.lang.strings().link_copied;
                let notice = self.exporter.copy_text(url.as_str(), done, &model.state);
                model.show_notice(notice);
            }
            Message::CopyEmbed => {
                let strings = model.state.lang.strings();
                let notice = match link::embed_url(&model.base_url, &model.editor.text()) {
                    Ok(url) => self.exporter.copy_text(
                        &link::embed_snippet(&url),
                        strings.embed_copied,
                        &model.state,
                    ),
                    Err(err) => Notice::error(strings.failed_with(err)),
                };
                model.show_notice(notice);
            }
            Message::CopyAiPrompt => {
                let prompt = link::ai_prompt(&model.base_url, &model.editor.text());
                let done = model.state.lang.strings().ai_prompt_copied;
                let notice = self.exporter.copy_text(&prompt, done, &model.state);
                model.show_notice(notice);
            }
            Message::ShowHelp => eprintln!("{HELP}"),
            _ => {}
        }
    }

    /// Start a render of the current source on a worker thread.
    fn spawn_render(&self, model: &mut Model, results: &Sender<RenderResult>) {
        let style = model.state.render_style();
        let job = model.pipeline.begin(&model.editor.text(), &style);
        let ticket = job.ticket().value();
        let engine = Arc::clone(&self.engine);
        let fonts = Arc::clone(self.exporter.fonts());
        let tx = results.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("render-{ticket}"))
            .spawn(move || {
                let result = job.run(engine.as_ref(), Some(fonts.as_ref()));
                // The loop may have exited; nothing is waiting for the result.
                let _ = tx.send(result);
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "could not start render worker");
            model.show_notice(Notice::error(model.state.lang.strings().failed_with(err)));
        }
    }

    fn export_to_output(&mut self, model: &mut Model) {
        let Some(output) = model.output.clone() else {
            return;
        };
        let mut job = ExportJob::new(
            model.preview.scene(),
            model.export_format,
            Destination::File(output),
            &model.state,
        );
        job.scale = model.scale;
        let notice = self.exporter.run(&job, &model.state);
        if notice.is_error() {
            model.show_notice(notice);
        }
    }
}

/// Write the editor text back to the source file.
pub(super) fn save_source(model: &mut Model, watcher: Option<&mut FileWatcher>) {
    let text = model.editor.text();
    if let Some(watcher) = watcher {
        watcher.note_contents(&text);
    }
    match std::fs::write(&model.file_path, &text) {
        Ok(()) => {
            model.editor.mark_clean();
            crate::perf::log_event(
                "app.save",
                format!("path={} bytes={}", model.file_path.display(), text.len()),
            );
        }
        Err(err) => {
            tracing::warn!(path = %model.file_path.display(), error = %err, "save failed");
            let notice = Notice::error(model.state.lang.strings().failed_with(err));
            model.show_notice(notice);
        }
    }
}

/// Prints the session state to a line-oriented terminal, only when it changes.
#[derive(Debug, Default)]
pub(super) struct Reporter {
    status: String,
    notice: Option<Notice>,
    error: Option<ErrorPanel>,
    look_warning: bool,
}

impl Reporter {
    pub(super) fn report(&mut self, model: &Model, out: &mut impl Write) -> io::Result<()> {
        let strings = model.state.lang.strings();

        let status = model.status_line();
        if status != self.status {
            writeln!(out, "{status}")?;
            self.status = status;
        }

        let error = model.preview.error().cloned();
        if error != self.error {
            if let Some(panel) = &error {
                writeln!(out, "  {}", panel.message)?;
                if let Some(hint) = &panel.hint {
                    writeln!(out, "  {}: {hint}", strings.error_tip)?;
                }
            }
            self.error = error;
        }

        let look_warning = model.preview.look_warning();
        if look_warning && !self.look_warning {
            writeln!(out, "  {}", strings.look_unsupported)?;
        }
        self.look_warning = look_warning;

        let notice = model.notice().cloned();
        if notice != self.notice {
            if let Some(notice) = &notice {
                writeln!(out, "> {notice}")?;
            }
            self.notice = notice;
        }
        Ok(())
    }
}
