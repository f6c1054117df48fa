//! Delivering exported blobs to the clipboard or a file.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::{Blob, ExportError};

/// Where an export ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Clipboard,
    File(PathBuf),
}

/// Host clipboard.
pub trait Clipboard {
    /// # Errors
    ///
    /// Returns [`ExportError::Clipboard`] if the host refuses the write.
    fn set_text(&mut self, text: &str) -> Result<(), ExportError>;

    /// Put RGBA pixels on the clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Clipboard`] if the host refuses the write.
    fn set_image(&mut self, width: u32, height: u32, rgba: Vec<u8>) -> Result<(), ExportError>;
}

/// The system clipboard through `arboard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

fn clipboard_error(err: arboard::Error) -> ExportError {
    ExportError::Clipboard(err.to_string())
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ExportError> {
        arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text))
            .map_err(clipboard_error)
    }

    fn set_image(&mut self, width: u32, height: u32, rgba: Vec<u8>) -> Result<(), ExportError> {
        let image = arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba),
        };
        arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_image(image))
            .map_err(clipboard_error)
    }
}

/// Write `blob` to `destination`. Returns the file written, if any.
///
/// # Errors
///
/// Returns [`ExportError`] if the clipboard or the file system refuses.
pub fn deliver(
    blob: &Blob,
    destination: &Destination,
    clipboard: &mut dyn Clipboard,
) -> Result<Option<PathBuf>, ExportError> {
    match destination {
        Destination::Clipboard => {
            to_clipboard(blob, clipboard)?;
            Ok(None)
        }
        Destination::File(path) => write_file(blob, path).map(Some),
    }
}

fn to_clipboard(blob: &Blob, clipboard: &mut dyn Clipboard) -> Result<(), ExportError> {
    if blob.mime == super::PNG_MIME {
        let image = image::load_from_memory(&blob.bytes)
            .map_err(|err| ExportError::Encode(err.to_string()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        clipboard.set_image(width, height, image.into_raw())
    } else {
        let text = std::str::from_utf8(&blob.bytes)
            .map_err(|err| ExportError::Encode(err.to_string()))?;
        clipboard.set_text(text)
    }
}

fn write_file(blob: &Blob, path: &Path) -> Result<PathBuf, ExportError> {
    let path = if path.extension().is_none() {
        path.with_extension(blob.extension())
    } else {
        path.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, &blob.bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = blob.bytes.len(), "export written");
    Ok(path)
}
