//! Live editing session.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete session state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Event loop that feeds commands, file changes and render
//!   results through `update` and performs the side effects

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::Model;
pub use update::{Message, update};

use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::engine::DiagramEngine;
use crate::export::fonts::FontCache;
use crate::export::raster::DEFAULT_SCALE;
use crate::export::{ExportFormat, Exporter};
use crate::share::link;
use crate::state::AppState;

/// Owns the collaborators of a session and runs its event loop.
pub struct App {
    file_path: PathBuf,
    engine: Arc<dyn DiagramEngine>,
    exporter: Exporter,
    state: AppState,
    base_url: Option<Url>,
    output: Option<PathBuf>,
    export_format: ExportFormat,
    scale: f32,
    watch_enabled: bool,
}

impl App {
    /// Create a session for the diagram at `file_path`.
    pub fn new(file_path: PathBuf, engine: Arc<dyn DiagramEngine>, fonts: Arc<FontCache>) -> Self {
        Self {
            file_path,
            engine,
            exporter: Exporter::new(fonts),
            state: AppState::default(),
            base_url: None,
            output: None,
            export_format: ExportFormat::Svg,
            scale: DEFAULT_SCALE,
            watch_enabled: true,
        }
    }

    /// Replace the exporter (and with it the clipboard).
    #[must_use]
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = state;
        self
    }

    /// Page the share links point at.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Re-export to `output` after every successful render.
    #[must_use]
    pub fn with_output(mut self, output: Option<PathBuf>, format: ExportFormat) -> Self {
        self.output = output;
        self.export_format = format;
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Enable or disable file watching.
    #[must_use]
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Session state for `source`, built from this app's settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was set and the built-in one fails to parse.
    pub fn make_model(&self, source: &str) -> Result<Model, url::ParseError> {
        let base_url = match &self.base_url {
            Some(url) => url.clone(),
            None => link::base_url(None)?,
        };
        Ok(
            Model::new(self.file_path.clone(), source, self.state.clone(), base_url)
                .with_output(self.output.clone(), self.export_format)
                .with_scale(self.scale),
        )
    }
}
