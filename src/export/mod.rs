//! Export subsystem: a rendered scene to a self-contained SVG or a PNG.
//!
//! Every export works on a [`VectorScene`] snapshot, so the preview can keep
//! rendering while an export is in flight. Font download failures never
//! fail an export; the document is exported with whatever fonts resolved.

pub mod fonts;
pub mod raster;
pub mod sink;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use color::DynamicColor;

pub use fonts::{FetchError, FontCache, FontFetcher, HttpFontFetcher};
pub use sink::{Clipboard, Destination, SystemClipboard};

use crate::notice::Notice;
use crate::perf;
use crate::preview::VectorScene;
use crate::state::{AppState, PreviewBackground};

pub const SVG_MIME: &str = "image/svg+xml";
pub const PNG_MIME: &str = "image/png";
const SVG_NS: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no diagram has been rendered yet")]
    NoDiagram,
    #[error("invalid SVG: {0}")]
    Svg(String),
    #[error("image too large: {width}x{height}")]
    TooLarge { width: u64, height: u64 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Svg,
    #[default]
    Png,
}

impl ExportFormat {
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Svg => SVG_MIME,
            Self::Png => PNG_MIME,
        }
    }
}

/// Raster background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Opaque([u8; 3]),
    Transparent,
}

impl Background {
    /// Parse a preview background name or any CSS color.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(preview) = PreviewBackground::parse(value) {
            return Self::parse(preview.export_color());
        }
        let color = DynamicColor::from_str(value).ok()?;
        let rgba = color.to_alpha_color::<color::Srgb>().to_rgba8();
        if rgba.a == 0 {
            Some(Self::Transparent)
        } else {
            Some(Self::Opaque([rgba.r, rgba.g, rgba.b]))
        }
    }

    pub fn for_preview(background: PreviewBackground) -> Self {
        Self::parse(background.export_color()).unwrap_or(Self::Transparent)
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::Opaque([255, 255, 255])
    }
}

/// Exported bytes with their mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub const fn new(mime: &'static str, bytes: Vec<u8>) -> Self {
        Self { mime, bytes }
    }

    pub fn extension(&self) -> &'static str {
        if self.mime == PNG_MIME { "png" } else { "svg" }
    }
}

/// One export request, built per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub scene: Option<VectorScene>,
    pub format: ExportFormat,
    pub background: Background,
    pub scale: f32,
    pub destination: Destination,
}

impl ExportJob {
    /// Job for the scene on screen with the state's background and default scale.
    pub fn new(
        scene: Option<&VectorScene>,
        format: ExportFormat,
        destination: Destination,
        state: &AppState,
    ) -> Self {
        Self {
            scene: scene.cloned(),
            format,
            background: Background::for_preview(state.background),
            scale: raster::DEFAULT_SCALE,
            destination,
        }
    }
}

pub struct Exporter {
    fonts: Arc<FontCache>,
    clipboard: Box<dyn Clipboard + Send>,
}

impl Exporter {
    pub fn new(fonts: Arc<FontCache>) -> Self {
        Self::with_clipboard(fonts, SystemClipboard)
    }

    pub fn with_clipboard(fonts: Arc<FontCache>, clipboard: impl Clipboard + Send + 'static) -> Self {
        Self {
            fonts,
            clipboard: Box::new(clipboard),
        }
    }

    pub const fn fonts(&self) -> &Arc<FontCache> {
        &self.fonts
    }

    /// Self-contained SVG with remote fonts inlined.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoDiagram`] when nothing has been rendered.
    pub fn export_vector(
        &self,
        scene: Option<&VectorScene>,
        state: &AppState,
    ) -> Result<Blob, ExportError> {
        let scene = scene.ok_or(ExportError::NoDiagram)?;
        let _scope = perf::scope("export.vector");
        // Only documents that actually use the preset need its file.
        let hand_font = Some(state.hand_font)
            .filter(|font| state.hand_drawn && scene.markup.contains(font.family()));
        let svg = ensure_namespace(&fonts::inline_fonts(&scene.markup, &self.fonts, hand_font));
        perf::log_event("export.vector", format!("id={} bytes={}", scene.id, svg.len()));
        Ok(Blob::new(SVG_MIME, svg.into_bytes()))
    }

    /// Export in `format`; PNG goes through the rasterizer.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when there is no diagram or rasterization fails.
    pub fn export_image(
        &self,
        scene: Option<&VectorScene>,
        format: ExportFormat,
        background: Background,
        scale: f32,
        state: &AppState,
    ) -> Result<Blob, ExportError> {
        let vector = self.export_vector(scene, state)?;
        if format == ExportFormat::Svg {
            return Ok(vector);
        }
        let svg = String::from_utf8_lossy(&vector.bytes);
        let png = raster::rasterize(&svg, Some(&self.fonts), scale, background)?;
        Ok(Blob::new(PNG_MIME, png))
    }

    /// Run `job` and describe the outcome as a notice.
    pub fn run(&mut self, job: &ExportJob, state: &AppState) -> Notice {
        let strings = state.lang.strings();
        let result = self
            .export_image(
                job.scene.as_ref(),
                job.format,
                job.background,
                job.scale,
                state,
            )
            .and_then(|blob| sink::deliver(&blob, &job.destination, self.clipboard.as_mut()));

        match result {
            Ok(_) => Notice::info(match (job.format, &job.destination) {
                (ExportFormat::Svg, Destination::Clipboard) => strings.copied_svg,
                (ExportFormat::Png, Destination::Clipboard) => strings.copied_png,
                (ExportFormat::Svg, Destination::File(_)) => strings.downloaded_svg,
                (ExportFormat::Png, Destination::File(_)) => strings.downloaded_png,
            }),
            Err(ExportError::NoDiagram) => Notice::warning(strings.no_diagram),
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                Notice::error(strings.failed_with(err))
            }
        }
    }

    /// Put plain text (share links, embed code) on the clipboard.
    pub fn copy_text(&mut self, text: &str, done: &str, state: &AppState) -> Notice {
        match self.clipboard.set_text(text) {
            Ok(()) => Notice::info(done),
            Err(err) => Notice::error(state.lang.strings().failed_with(err)),
        }
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("fonts", &self.fonts)
            .finish_non_exhaustive()
    }
}

/// Standalone SVG files need the namespace on the root element.
fn ensure_namespace(svg: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let end = svg[start..].find('>').map_or(svg.len(), |i| start + i);
    if svg[start..end].contains("xmlns=") {
        return svg.to_string();
    }
    let insert_at = start + "<svg".len();
    format!("{} xmlns=\"{SVG_NS}\"{}", &svg[..insert_at], &svg[insert_at..])
}
