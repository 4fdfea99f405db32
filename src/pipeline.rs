use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageEncoder, RgbaImage};
use std::time::Instant;
use tracing::debug;

use crate::compose::{compose, ComposeParams};
use crate::font::FontSource;
use crate::text::{render_text, LayoutParams};
use crate::ThumbError;

/// Section labels of the canonical study-abroad layout:
/// country/city, host institution, period, home affiliation at departure.
pub const DEFAULT_SECTION_LABELS: [&str; 4] = ["国/都市", "留学先", "期間", "留学開始時所属"];

/// Filename suggested to the download collaborator.
pub const OUTPUT_FILE_NAME: &str = "thumbnail.jpg";

/// Everything one generation needs. Images arrive already cropped by the
/// host (3:2 subject, 4:3 background); nothing here re-checks aspect ratio.
#[derive(Clone, Debug)]
pub struct ThumbnailRequest {
    pub subject: RgbaImage,
    pub background: RgbaImage,
    pub name: String,
    pub sections: Vec<(String, String)>,
    pub font: FontSource,
    pub compose: ComposeParams,
    pub layout: LayoutParams,
}

impl ThumbnailRequest {
    /// Request with the four canonical fields and default parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subject: RgbaImage,
        background: RgbaImage,
        name: impl Into<String>,
        destination: impl Into<String>,
        institution: impl Into<String>,
        period: impl Into<String>,
        affiliation: impl Into<String>,
        font: FontSource,
    ) -> Self {
        let values = [
            destination.into(),
            institution.into(),
            period.into(),
            affiliation.into(),
        ];
        let sections = DEFAULT_SECTION_LABELS
            .iter()
            .zip(values)
            .map(|(label, value)| (label.to_string(), value))
            .collect();
        Self::with_sections(subject, background, name, sections, font)
    }

    /// Request with caller-supplied sections (any count, including zero).
    pub fn with_sections(
        subject: RgbaImage,
        background: RgbaImage,
        name: impl Into<String>,
        sections: Vec<(String, String)>,
        font: FontSource,
    ) -> Self {
        Self {
            subject,
            background,
            name: name.into(),
            sections,
            font,
            compose: ComposeParams::default(),
            layout: LayoutParams::default(),
        }
    }
}

/// The finished artifact, ready for the presentation/download collaborator.
#[derive(Debug)]
pub struct Thumbnail {
    /// RGB JPEG bytes, alpha stripped.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
    /// True when the requested font was unusable and the built-in fallback
    /// face rendered the text. Degraded, not failed.
    pub degraded: bool,
}

/// Run the whole pipeline: compose the canvas, render the text block,
/// strip alpha, encode JPEG. Single pass, no retries; identical inputs
/// yield byte-identical output.
pub fn generate(req: &ThumbnailRequest) -> Result<Thumbnail, ThumbError> {
    let started = Instant::now();

    let (mut canvas, panel) = compose(&req.subject, &req.background, &req.compose)?;

    let face = req.font.resolve_or_fallback();
    let degraded = face.is_fallback();
    let block = render_text(
        &mut canvas,
        &panel,
        &req.layout,
        &face,
        &req.name,
        &req.sections,
    );
    debug!(
        base_px = block.base_px,
        name_px = block.name_px,
        end_y = block.end_y,
        panel_bottom = panel.bottom_y,
        "text block laid out"
    );

    let (width, height) = canvas.dimensions();
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();

    let mut jpeg = Vec::new();
    let enc = JpegEncoder::new(&mut jpeg);
    enc.write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| ThumbError::Image(e.to_string()))?;

    debug!(
        width,
        height,
        degraded,
        ms = started.elapsed().as_secs_f64() * 1000.0,
        "thumbnail generated"
    );

    Ok(Thumbnail {
        jpeg,
        width,
        height,
        file_name: OUTPUT_FILE_NAME.to_string(),
        degraded,
    })
}
