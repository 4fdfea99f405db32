use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::ThumbError;

const CANVAS_BG: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PANEL_FILL: [u8; 3] = [255, 255, 255];

/// How the common height of the two photos is derived.
///
/// The source material disagreed with itself here; both observed behaviors
/// are kept selectable, with [`HeightPolicy::MatchBackground`] as the
/// canonical default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightPolicy {
    /// Scale the subject to the background's height; background untouched.
    #[default]
    MatchBackground,
    /// Scale both photos to the smaller of the two heights.
    MinOfBoth,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeParams {
    pub height_policy: HeightPolicy,
    /// Fraction of background width forming the panel's top edge.
    pub top_base_ratio: f32,
    /// Fraction of background width forming the panel's bottom edge.
    /// Must strictly exceed `top_base_ratio` (panel widens downward).
    pub bottom_base_ratio: f32,
    /// Fraction of canvas height left above the panel.
    pub top_margin_ratio: f32,
    /// Alpha of the white panel fill.
    pub panel_alpha: u8,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            height_policy: HeightPolicy::MatchBackground,
            top_base_ratio: 0.75,
            bottom_base_ratio: 0.95,
            top_margin_ratio: 0.15,
            panel_alpha: 180,
        }
    }
}

/// The translucent trapezoid overlaid on the background half.
///
/// Right edge is flush with the canvas; the left edge slants outward from
/// `(left_top_x, top_margin)` down to `(left_bottom_x, bottom_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Panel {
    pub top_margin: u32,
    pub trapezoid_height: u32,
    pub left_top_x: u32,
    pub left_bottom_x: u32,
    pub right_x: u32,
    pub bottom_y: u32,
}

impl Panel {
    /// Corners in drawing order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [(u32, u32); 4] {
        [
            (self.left_top_x, self.top_margin),
            (self.right_x, self.top_margin),
            (self.right_x, self.bottom_y),
            (self.left_bottom_x, self.bottom_y),
        ]
    }

    fn derive(
        canvas_w: u32,
        canvas_h: u32,
        background_w: u32,
        params: &ComposeParams,
    ) -> Result<Self, ThumbError> {
        let top_base = scaled(background_w, params.top_base_ratio);
        let bottom_base = scaled(background_w, params.bottom_base_ratio);
        if bottom_base <= top_base {
            return Err(ThumbError::PanelGeometry(format!(
                "bottom base ({bottom_base}) must exceed top base ({top_base})"
            )));
        }
        if bottom_base > canvas_w {
            return Err(ThumbError::PanelGeometry(format!(
                "bottom base ({bottom_base}) exceeds canvas width ({canvas_w})"
            )));
        }
        let top_margin = scaled(canvas_h, params.top_margin_ratio);
        if top_margin >= canvas_h {
            return Err(ThumbError::PanelGeometry(format!(
                "top margin ({top_margin}) leaves no panel height (canvas {canvas_h})"
            )));
        }
        Ok(Panel {
            top_margin,
            trapezoid_height: canvas_h - top_margin,
            left_top_x: canvas_w - top_base,
            left_bottom_x: canvas_w - bottom_base,
            right_x: canvas_w,
            bottom_y: canvas_h,
        })
    }
}

fn scaled(v: u32, ratio: f32) -> u32 {
    (v as f32 * ratio).round() as u32
}

fn check_nonzero(img: &RgbaImage, what: &str) -> Result<(), ThumbError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ThumbError::InvalidImage(format!(
            "{what} is {}x{}",
            img.width(),
            img.height()
        )));
    }
    Ok(())
}

fn resize_to_height(img: &RgbaImage, h: u32) -> RgbaImage {
    if img.height() == h {
        return img.clone();
    }
    let w = ((img.width() as f32 * h as f32 / img.height() as f32).round() as u32).max(1);
    imageops::resize(img, w, h, imageops::FilterType::Lanczos3)
}

/// Paste `over` onto `base` at `(x, y)` using `over`'s own alpha as mask.
/// Destination alpha stays opaque.
fn paste_masked(base: &mut RgbaImage, over: &RgbaImage, x: u32, y: u32) {
    for (ox, oy, p) in over.enumerate_pixels() {
        let a = p.0[3] as f32 / 255.0;
        if a <= 0.0 {
            continue;
        }
        let bx = x + ox;
        let by = y + oy;
        if bx >= base.width() || by >= base.height() {
            continue;
        }
        let dst = base.get_pixel_mut(bx, by);
        let inv = 1.0 - a;
        dst.0[0] = (p.0[0] as f32 * a + dst.0[0] as f32 * inv) as u8;
        dst.0[1] = (p.0[1] as f32 * a + dst.0[1] as f32 * inv) as u8;
        dst.0[2] = (p.0[2] as f32 * a + dst.0[2] as f32 * inv) as u8;
        dst.0[3] = 255;
    }
}

/// Fill the trapezoid row by row on a transparent overlay buffer.
/// The left edge is interpolated between the two slant endpoints.
fn fill_panel(overlay: &mut RgbaImage, panel: &Panel, fill: Rgba<u8>) {
    let y0 = panel.top_margin as f32;
    let y1 = panel.bottom_y as f32;
    let x0 = panel.left_top_x as f32;
    let x1 = panel.left_bottom_x as f32;
    for y in panel.top_margin..panel.bottom_y {
        let t = if y1 > y0 { (y as f32 - y0) / (y1 - y0) } else { 0.0 };
        let left = (x0 + (x1 - x0) * t).round().max(0.0) as u32;
        for x in left..panel.right_x.min(overlay.width()) {
            overlay.put_pixel(x, y, fill);
        }
    }
}

/// Build the side-by-side canvas and overlay the translucent panel.
///
/// Returns the mutated canvas plus the panel geometry the text layout
/// engine renders into. Fails fast on zero-area inputs; nothing is
/// allocated in that case.
pub fn compose(
    subject: &RgbaImage,
    background: &RgbaImage,
    params: &ComposeParams,
) -> Result<(RgbaImage, Panel), ThumbError> {
    check_nonzero(subject, "subject")?;
    check_nonzero(background, "background")?;

    let h = match params.height_policy {
        HeightPolicy::MatchBackground => background.height(),
        HeightPolicy::MinOfBoth => subject.height().min(background.height()),
    };
    let subject = resize_to_height(subject, h);
    let background = resize_to_height(background, h);

    let canvas_w = subject.width() + background.width();
    let panel = Panel::derive(canvas_w, h, background.width(), params)?;

    let mut canvas = RgbaImage::from_pixel(canvas_w, h, CANVAS_BG);
    paste_masked(&mut canvas, &subject, 0, 0);
    paste_masked(&mut canvas, &background, subject.width(), 0);

    // The panel is rasterized on its own fully transparent buffer and then
    // composited, so everything outside the trapezoid stays untouched.
    let mut overlay = RgbaImage::from_pixel(canvas_w, h, Rgba([255, 255, 255, 0]));
    let fill = Rgba([PANEL_FILL[0], PANEL_FILL[1], PANEL_FILL[2], params.panel_alpha]);
    fill_panel(&mut overlay, &panel, fill);
    paste_masked(&mut canvas, &overlay, 0, 0);

    Ok((canvas, panel))
}
