//! Fixed-layout promotional thumbnail composition.
//!
//! Two already-cropped photos go in (subject portrait on the left,
//! background location shot on the right), five labeled text fields go in,
//! one JPEG comes out: the images are normalized to a common height and
//! placed side by side, a translucent trapezoid panel is overlaid on the
//! background half, and the text is rendered inside the panel with font
//! sizes solved so the block fills the panel's height.
//!
//! The crop UI, font download and upload/download shell are the host's
//! problem; this crate only consumes raster images, strings and a
//! [`FontSource`], and produces [`Thumbnail`] bytes.

mod compose;
mod font;
mod pipeline;
mod text;

pub use compose::{compose, ComposeParams, HeightPolicy, Panel};
pub use font::{FontError, FontFace, FontSource};
pub use pipeline::{
    generate, Thumbnail, ThumbnailRequest, DEFAULT_SECTION_LABELS, OUTPUT_FILE_NAME,
};
pub use text::{
    layout_block, render_block, render_text, solve_font_sizes, LayoutParams, SizeClass, TextBlock,
    TextLine,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbError {
    /// An input image has zero width or height.
    #[error("invalid image: {0}")]
    InvalidImage(String),
    /// Panel tunables violate the trapezoid invariants.
    #[error("panel geometry: {0}")]
    PanelGeometry(String),
    /// Encoding/decoding failure from the image backend.
    #[error("image: {0}")]
    Image(String),
}
