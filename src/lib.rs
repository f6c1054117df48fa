// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. export::ExportError)
    clippy::module_name_repetitions
)]

//! # mermaidpad
//!
//! A live editor and exporter for Mermaid diagrams.
//!
//! mermaidpad turns diagram source into a preview and exports with:
//! - Per-grammar reindentation of the source
//! - Render pipeline with stale-result protection and line-accurate errors
//! - Self-contained SVG and PNG export with embedded fonts
//! - Share links that carry the whole diagram in the URL
//!
//! ## Architecture
//!
//! The live session uses The Elm Architecture (TEA) pattern:
//! - **Model**: Session state
//! - **Message**: Commands, file changes and render results
//! - **Update**: Pure state transitions
//! - **Effects**: Render workers, clipboard and files
//!
//! ## Modules
//!
//! - [`app`]: Live editing session and event loop
//! - [`format`]: Source formatter
//! - [`pipeline`]: Render pipeline and error diagnostics
//! - [`export`]: SVG/PNG export, font inlining, delivery
//! - [`preview`]: Preview surface and pan/zoom viewport
//! - [`share`]: URL state codec and share links
//! - [`engine`]: Diagram engine interface and adapter
//! - [`editor`]: Editor interface and text buffer
//! - [`watcher`]: File watching

pub mod app;
pub mod config;
pub mod editor;
pub mod embed;
pub mod engine;
pub mod export;
pub mod format;
pub mod i18n;
pub mod notice;
pub mod perf;
pub mod pipeline;
pub mod preview;
pub mod samples;
pub mod share;
pub mod state;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::engine::{DiagramEngine, MermaidEngine};
    pub use crate::export::{ExportFormat, Exporter};
    pub use crate::pipeline::RenderPipeline;
    pub use crate::state::AppState;
}
