use std::fs;
use std::io;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, RgbaImage};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Quality for flattened JPEG composite output.
const JPEG_QUALITY: u8 = 95;

/// Failures while blending an overlay onto base media. Shared between the
/// image and video variants.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{tool} not found; is it installed and on PATH?")]
    ToolMissing { tool: String },
    #[error("{tool} failed with status {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("cannot probe video stream: {0}")]
    Probe(String),
}

/// Alpha-composites `overlay` over `base` and writes the result to `output`.
///
/// The overlay is resampled to the base's dimensions when they differ; the
/// base is never cropped or stretched. Output encodes as PNG when `output`
/// ends in `.png`, otherwise as JPEG flattened to opaque. The file at
/// `output` only appears once the full composition has succeeded.
pub fn composite_image(base: &Path, overlay: &Path, output: &Path) -> Result<(), CompositeError> {
    let base_img = open_image(base)?;
    let overlay_img = open_image(overlay)?;

    let blended = blend_over(&base_img, &overlay_img);

    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    if wants_png(output) {
        DynamicImage::ImageRgba8(blended).write_to(tmp.as_file_mut(), ImageFormat::Png)?;
    } else {
        let flattened = DynamicImage::ImageRgba8(blended).to_rgb8();
        JpegEncoder::new_with_quality(tmp.as_file_mut(), JPEG_QUALITY).encode_image(&flattened)?;
    }
    tmp.as_file_mut().sync_all()?;

    if output.exists() {
        fs::remove_file(output)?;
    }
    tmp.persist(output).map_err(|e| CompositeError::Io(e.error))?;
    Ok(())
}

pub(crate) fn open_image(path: &Path) -> Result<DynamicImage, CompositeError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

/// Standard "over" blend of the overlay onto the base, at the base's size.
fn blend_over(base: &DynamicImage, overlay: &DynamicImage) -> RgbaImage {
    let (width, height) = base.dimensions();
    let overlay = if overlay.dimensions() == (width, height) {
        overlay.clone()
    } else {
        overlay.resize_exact(width, height, FilterType::Lanczos3)
    };

    let mut out = base.to_rgba8();
    let top = overlay.to_rgba8();
    for (under, over) in out.pixels_mut().zip(top.pixels()) {
        let alpha = over[3] as f32 / 255.0;
        for channel in 0..3 {
            let blended = over[channel] as f32 * alpha + under[channel] as f32 * (1.0 - alpha);
            under[channel] = blended.round() as u8;
        }
        let out_alpha = alpha + (under[3] as f32 / 255.0) * (1.0 - alpha);
        under[3] = (out_alpha * 255.0).round() as u8;
    }
    out
}

fn wants_png(output: &Path) -> bool {
    output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}
