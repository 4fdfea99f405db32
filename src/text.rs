use image::{Rgba, RgbaImage};
use rusttype::{point, Scale};
use serde::{Deserialize, Serialize};

use crate::compose::Panel;
use crate::font::{builtin_glyph, FontFace, BUILTIN_ADVANCE_PX};

const TEXT_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Structural constants of the text layout.
///
/// The solver constants (`padding_units`, the per-section unit baked into
/// the solver) are heuristic fudge factors inherited from the source
/// layout, kept as-is for output parity rather than re-derived. They may
/// leave up to one line-height of slack at the panel bottom.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Extra vertical space after each line, as a fraction of its font size.
    pub line_spacing_ratio: f32,
    /// Fixed pixel gap after each (label, value) section. Not scaled.
    pub section_gap_px: u32,
    /// Name font size as a multiple of the body size.
    pub name_scale: f32,
    /// Line-size units reserved as top/bottom breathing room by the solver.
    pub padding_units: f32,
    /// Horizontal offset of every line from the panel's top-left corner.
    pub text_inset_px: u32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            line_spacing_ratio: 0.4,
            section_gap_px: 10,
            name_scale: 1.5,
            padding_units: 2.0,
            text_inset_px: 40,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeClass {
    Name,
    Body,
}

/// One renderable line. `y` is the top of the line, PIL-style.
#[derive(Clone, Debug)]
pub struct TextLine {
    pub x: u32,
    pub y: u32,
    pub class: SizeClass,
    pub text: String,
}

/// The laid-out block: every line with its position, plus the solved sizes
/// and the cursor position after the last section.
#[derive(Clone, Debug)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub base_px: u32,
    pub name_px: u32,
    pub end_y: u32,
}

/// Solve `(body, name)` font sizes so the name line plus `2n` section lines
/// fill the panel height.
///
/// `total_units` counts whole lines, the fractional inter-line spacing, and
/// one unit per inter-section gap (an approximation; the gap itself is a
/// fixed pixel amount added during layout). Two extra units are reserved as
/// top/bottom breathing room.
pub fn solve_font_sizes(
    trapezoid_height: u32,
    section_count: usize,
    params: &LayoutParams,
) -> (u32, u32) {
    let base_lines = 1 + 2 * section_count;
    let total_units = base_lines as f32
        + (base_lines - 1) as f32 * params.line_spacing_ratio
        + section_count as f32;
    let base_px = (trapezoid_height as f32 / (total_units + params.padding_units)) as u32;
    let base_px = base_px.max(1);
    let name_px = ((base_px as f32 * params.name_scale) as u32).max(1);
    (base_px, name_px)
}

/// Pure layout pass: positions every line without touching pixels.
///
/// Empty strings still get a line entry so the cursor advances by the full
/// reserved height; layout stays stable when a field is blank. Values are
/// prefixed with an ideographic space (U+3000) for visual indent.
pub fn layout_block(
    panel: &Panel,
    params: &LayoutParams,
    name: &str,
    sections: &[(String, String)],
) -> TextBlock {
    let (base_px, name_px) = solve_font_sizes(panel.trapezoid_height, sections.len(), params);
    let spacing = 1.0 + params.line_spacing_ratio;
    let x = panel.left_top_x + params.text_inset_px;

    let mut lines = Vec::with_capacity(1 + sections.len() * 2);
    // One line of top padding.
    let mut y = panel.top_margin + base_px;

    lines.push(TextLine {
        x,
        y,
        class: SizeClass::Name,
        text: name.to_string(),
    });
    y += (name_px as f32 * spacing) as u32;

    for (label, value) in sections {
        lines.push(TextLine {
            x,
            y,
            class: SizeClass::Body,
            text: label.clone(),
        });
        y += (base_px as f32 * spacing) as u32;
        lines.push(TextLine {
            x,
            y,
            class: SizeClass::Body,
            text: format!("\u{3000}{value}"),
        });
        y += (base_px as f32 * spacing) as u32;
        y += params.section_gap_px;
    }

    TextBlock {
        lines,
        base_px,
        name_px,
        end_y: y,
    }
}

/// Burn a laid-out block into the canvas as opaque black pixels.
pub fn render_block(canvas: &mut RgbaImage, block: &TextBlock, face: &FontFace) {
    for line in &block.lines {
        let px = match line.class {
            SizeClass::Name => block.name_px,
            SizeClass::Body => block.base_px,
        };
        draw_line(canvas, face, &line.text, line.x as i32, line.y as i32, px as f32);
    }
}

/// Layout plus render in one call; returns the block for inspection.
pub fn render_text(
    canvas: &mut RgbaImage,
    panel: &Panel,
    params: &LayoutParams,
    face: &FontFace,
    name: &str,
    sections: &[(String, String)],
) -> TextBlock {
    let block = layout_block(panel, params, name, sections);
    render_block(canvas, &block, face);
    block
}

fn draw_line(img: &mut RgbaImage, face: &FontFace, text: &str, x: i32, y: i32, px: f32) {
    match face {
        FontFace::Truetype(font) => draw_truetype(img, font.as_ref(), text, x, y, px),
        // The fallback face ignores the solved size; the cursor math does
        // not, so the layout stays identical and only the glyphs shrink.
        FontFace::Builtin => draw_builtin(img, text, x, y),
    }
}

fn draw_truetype(img: &mut RgbaImage, font: &rusttype::Font<'_>, text: &str, x: i32, y: i32, px: f32) {
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    // Incoming y is the top of the line; rusttype wants the baseline.
    let baseline = y as f32 + v_metrics.ascent;

    for glyph in font.layout(text, scale, point(x as f32, baseline)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 {
                    return;
                }
                let a = (coverage * 255.0) as u8;
                blend_px(img, px as u32, py as u32, a);
            });
        }
    }
}

fn draw_builtin(img: &mut RgbaImage, text: &str, x: i32, y: i32) {
    let mut caret = x;
    for ch in text.chars() {
        let rows = builtin_glyph(ch);
        for (ry, bits) in rows.iter().enumerate() {
            for rx in 0..5u8 {
                if bits & (0x10 >> rx) != 0 {
                    let px = caret + rx as i32;
                    let py = y + ry as i32;
                    if px >= 0 && py >= 0 {
                        blend_px(img, px as u32, py as u32, 255);
                    }
                }
            }
        }
        caret += BUILTIN_ADVANCE_PX as i32;
    }
}

fn blend_px(img: &mut RgbaImage, x: u32, y: u32, alpha: u8) {
    if alpha == 0 || x >= img.width() || y >= img.height() {
        return;
    }
    let dst = img.get_pixel_mut(x, y);
    let a = alpha as f32 / 255.0;
    let inv = 1.0 - a;
    dst.0[0] = (TEXT_FILL.0[0] as f32 * a + dst.0[0] as f32 * inv) as u8;
    dst.0[1] = (TEXT_FILL.0[1] as f32 * a + dst.0[1] as f32 * inv) as u8;
    dst.0[2] = (TEXT_FILL.0[2] as f32 * a + dst.0[2] as f32 * inv) as u8;
    dst.0[3] = 255;
}
