//! SVG sanitizing and PNG rasterization.

use std::sync::{Arc, LazyLock};

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use regex::{Captures, Regex};
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};

use super::fonts::FontCache;
use super::{Background, ExportError};
use crate::engine::fix_font_family_quotes;
use crate::perf;

/// Raster scale used when none is given.
pub const DEFAULT_SCALE: f32 = 4.0;
pub const MIN_SCALE: f32 = 0.25;
pub const MAX_SCALE: f32 = 16.0;
/// Natural size assumed when the document reports none.
pub const FALLBACK_SIZE: (f32, f32) = (800.0, 600.0);
/// Largest output side in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

static IMAGE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<image\b[^>]*/>|<image\b[^>]*>.*?</image>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(<style\b[^>]*>)(.*?)(</style>)").unwrap());
static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?https?://[^'")\s]+['"]?\s*\)"#).unwrap()
});

/// System fonts, loaded once.
static SYSTEM_FONTS: LazyLock<Arc<fontdb::Database>> = LazyLock::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts");
    Arc::new(db)
});

/// Clamp a requested scale; non-finite values mean the default.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        DEFAULT_SCALE
    }
}

/// Remove `<image>` elements and remote `url(...)` references in styles.
///
/// External resources would make the rasterizer reach out to the network.
pub fn sanitize(svg: &str) -> String {
    let without_images = IMAGE_ELEMENT.replace_all(svg, "");
    STYLE_BLOCK
        .replace_all(&without_images, |caps: &Captures<'_>| {
            format!(
                "{}{}{}",
                &caps[1],
                REMOTE_URL.replace_all(&caps[2], ""),
                &caps[3]
            )
        })
        .into_owned()
}

fn font_database(fonts: Option<&FontCache>) -> Arc<fontdb::Database> {
    let extra: Vec<_> = fonts
        .map(FontCache::files)
        .unwrap_or_default()
        .into_iter()
        .filter(|file| file.is_sfnt())
        .collect();
    if extra.is_empty() {
        return Arc::clone(&SYSTEM_FONTS);
    }
    let mut db = (**SYSTEM_FONTS).clone();
    for file in extra {
        db.load_font_data(file.bytes.to_vec());
    }
    Arc::new(db)
}

/// Pixel size for a document of `natural` size at `scale`.
///
/// # Errors
///
/// Returns [`ExportError::TooLarge`] if either side exceeds [`MAX_DIMENSION`].
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn target_size(natural: (f32, f32), scale: f32) -> Result<(u32, u32), ExportError> {
    let (w, h) = if natural.0 > 0.0 && natural.1 > 0.0 {
        natural
    } else {
        FALLBACK_SIZE
    };
    let width = (w * scale).ceil();
    let height = (h * scale).ceil();
    let max = MAX_DIMENSION as f32;
    if width > max || height > max {
        return Err(ExportError::TooLarge {
            width: width as u64,
            height: height as u64,
        });
    }
    Ok(((width as u32).max(1), (height as u32).max(1)))
}

/// Rasterize `svg` to PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError`] if the document cannot be parsed, is too large,
/// or cannot be encoded.
pub fn rasterize(
    svg: &str,
    fonts: Option<&FontCache>,
    scale: f32,
    background: Background,
) -> Result<Vec<u8>, ExportError> {
    let _scope = perf::scope("export.rasterize");
    let scale = clamp_scale(scale);
    let svg = fix_font_family_quotes(&sanitize(svg));

    let options = usvg::Options {
        fontdb: font_database(fonts),
        ..Default::default()
    };
    let tree =
        usvg::Tree::from_str(&svg, &options).map_err(|err| ExportError::Svg(err.to_string()))?;
    let natural = (tree.size().width(), tree.size().height());
    let (width, height) = target_size(natural, scale)?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or(ExportError::TooLarge {
            width: u64::from(width),
            height: u64::from(height),
        })?;
    if let Background::Opaque([r, g, b]) = background {
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
    }
    #[allow(clippy::cast_precision_loss)]
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / natural.0.max(1.0),
        height as f32 / natural.1.max(1.0),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let png = encode(&pixmap)?;
    perf::log_event(
        "export.rasterize",
        format!("{width}x{height} scale={scale} bytes={}", png.len()),
    );
    Ok(png)
}

/// Encode through `image`, falling back once to tiny-skia's own writer.
fn encode(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, ExportError> {
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let c = pixel.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    let mut png = Vec::new();
    match PngEncoder::new(&mut png).write_image(
        &rgba,
        pixmap.width(),
        pixmap.height(),
        image::ExtendedColorType::Rgba8,
    ) {
        Ok(()) => Ok(png),
        Err(err) => {
            tracing::warn!(error = %err, "png encoder failed, using fallback writer");
            pixmap
                .encode_png()
                .map_err(|fallback| ExportError::Encode(format!("{err}; {fallback}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5"><rect width="10" height="5" fill="#ff0000"/></svg>"##;

    #[test]
    fn test_sanitize_strips_images_and_remote_urls() {
        let svg = r#"<svg><image href="https://x/p.png"/><image href="a"></image><style>a{src:url('https://x/f.woff2')} b{fill:url(#grad)}</style></svg>"#;
        assert_eq!(
            sanitize(svg),
            "<svg><style>a{src:} b{fill:url(#grad)}</style></svg>"
        );
    }

    #[test]
    fn test_scale_is_clamped() {
        assert!((clamp_scale(100.0) - MAX_SCALE).abs() < f32::EPSILON);
        assert!((clamp_scale(0.0) - MIN_SCALE).abs() < f32::EPSILON);
        assert!((clamp_scale(f32::NAN) - DEFAULT_SCALE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_target_size_fallback_and_limit() {
        assert_eq!(target_size((0.0, 0.0), 1.0).unwrap(), (800, 600));
        assert_eq!(target_size((10.0, 5.0), 4.0).unwrap(), (40, 20));
        assert!(matches!(
            target_size((5000.0, 10.0), 4.0),
            Err(ExportError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_rasterize_opaque_square() {
        let png = rasterize(SQUARE, None, 2.0, Background::Opaque([255, 255, 255])).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (20, 10));
        assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_transparent_background_keeps_alpha() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="2" height="4" fill="#000"/></svg>"##;
        let png = rasterize(svg, None, 1.0, Background::Transparent).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
        assert_eq!(img.get_pixel(3, 0).0[3], 0);
    }

    #[test]
    fn test_invalid_svg_is_reported() {
        assert!(matches!(
            rasterize("<svg", None, 1.0, Background::Transparent),
            Err(ExportError::Svg(_))
        ));
    }
}
