//! QR image rendering and decoding.
//!
//! Downloads encode the canonical viewer URL `<origin>/qr/<id>`. Decoding is
//! used by the scan flow to read codes from image files.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, bail};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use url::Url;

/// Target edge length of a downloaded image, in pixels.
pub const DOWNLOAD_WIDTH: u32 = 300;

/// Light modules around the symbol.
pub const QUIET_ZONE: u32 = 2;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// A rendered, ready-to-save QR image.
#[derive(Debug, Clone)]
pub struct RenderedQr {
    /// The URL encoded in the image.
    pub url: String,
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Parses and validates the public web origin.
///
/// # Errors
/// Returns an error if `origin` is not an absolute http(s) URL.
pub fn parse_origin(origin: &str) -> Result<Url> {
    let url = Url::parse(origin.trim()).with_context(|| format!("Invalid origin: {origin}"))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        bail!("Invalid origin: {origin}");
    }
    Ok(url)
}

/// The URL finders land on when they scan `code_id`.
pub fn viewer_url(origin: &Url, code_id: &str) -> String {
    let mut url = origin.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(["qr", code_id]);
    }
    url.into()
}

pub fn download_file_name(code_id: &str) -> String {
    let safe: String = code_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("foundee-qr-{safe}.png")
}

/// Renders `data` as a greyscale QR image no wider than [`DOWNLOAD_WIDTH`].
///
/// Modules are drawn at a whole-pixel scale so the output is deterministic.
///
/// # Errors
/// Returns an error if `data` is too long to encode.
pub fn render_image(data: &str) -> Result<GrayImage> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .context("Failed to encode QR code")?;
    let modules = u32::try_from(code.width()).context("QR code too large")?;
    let colors = code.to_colors();

    let span = modules + QUIET_ZONE * 2;
    let scale = (DOWNLOAD_WIDTH / span).max(1);
    let size = span * scale;

    Ok(GrayImage::from_fn(size, size, |x, y| {
        let mx = x / scale;
        let my = y / scale;
        if mx < QUIET_ZONE || my < QUIET_ZONE {
            return LIGHT;
        }
        let (mx, my) = (mx - QUIET_ZONE, my - QUIET_ZONE);
        if mx >= modules || my >= modules {
            return LIGHT;
        }
        match colors[(my * modules + mx) as usize] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    }))
}

/// Renders `data` as PNG bytes.
///
/// # Errors
/// Returns an error if encoding fails.
pub fn render_png(data: &str) -> Result<Vec<u8>> {
    use image::ImageEncoder as _;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let image = render_image(data)?;
    let (width, height) = image.dimensions();
    let mut png = Vec::new();
    PngEncoder::new_with_quality(&mut png, CompressionType::Default, FilterType::Adaptive)
        .write_image(image.as_raw(), width, height, image::ExtendedColorType::L8)
        .context("Failed to encode PNG")?;
    Ok(png)
}

/// Renders the downloadable image for `code_id`.
///
/// # Errors
/// Returns an error if encoding fails.
pub fn render_downloadable(origin: &Url, code_id: &str) -> Result<RenderedQr> {
    let url = viewer_url(origin, code_id);
    let png = render_png(&url)?;
    Ok(RenderedQr {
        url,
        file_name: download_file_name(code_id),
        png,
    })
}

/// Returns the payload of the first readable QR code in `image`.
pub fn decode_luma(image: &GrayImage) -> Option<String> {
    let (width, height) = image.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );
    prepared
        .detect_grids()
        .into_iter()
        .find_map(|grid| match grid.decode() {
            Ok((_, content)) => Some(content),
            Err(e) => {
                tracing::debug!(error = %e, "found a QR grid that did not decode");
                None
            }
        })
}

/// Decodes a QR code from encoded image bytes (PNG, JPEG, WebP).
///
/// # Errors
/// Returns an error if the bytes are not a supported image.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<Option<String>> {
    let image = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to read image")?
        .decode()
        .context("Failed to decode image")?;
    Ok(decode_luma(&image.to_luma8()))
}

/// Decodes a QR code from an image file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a supported image.
pub fn decode_file(path: &Path) -> Result<Option<String>> {
    let image =
        image::open(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(decode_luma(&image.to_luma8()))
}
