use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusttype::Font;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse font {0}")]
    Parse(String),
}

/// Where the TrueType/OpenType resource comes from.
///
/// The host's fetch-and-cache collaborator hands one of these in; there is
/// no ambient filesystem probing inside the layout engine.
#[derive(Clone, Debug)]
pub enum FontSource {
    File(PathBuf),
    Bytes(Arc<Vec<u8>>),
}

// Parsed fonts are shared read-only across requests.
static FONT_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<Font<'static>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn load_font_cached(path: &Path) -> Result<Arc<Font<'static>>, FontError> {
    if let Some(f) = FONT_CACHE.lock().get(path) {
        return Ok(Arc::clone(f));
    }

    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let f = Font::try_from_vec(bytes)
        .ok_or_else(|| FontError::Parse(path.display().to_string()))?;

    let f = Arc::new(f);
    FONT_CACHE
        .lock()
        .insert(path.to_path_buf(), Arc::clone(&f));
    Ok(f)
}

impl FontSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        FontSource::File(path.into())
    }

    pub fn bytes(bytes: Vec<u8>) -> Self {
        FontSource::Bytes(Arc::new(bytes))
    }

    /// Load and parse the font, or report a typed failure.
    pub fn resolve(&self) -> Result<Arc<Font<'static>>, FontError> {
        match self {
            FontSource::File(path) => load_font_cached(path),
            FontSource::Bytes(bytes) => Font::try_from_vec(bytes.as_ref().clone())
                .map(Arc::new)
                .ok_or_else(|| FontError::Parse("in-memory bytes".into())),
        }
    }

    /// Resolve, degrading to the built-in face on failure. Generation must
    /// never abort for font reasons; the fallback just looks worse.
    pub fn resolve_or_fallback(&self) -> FontFace {
        match self.resolve() {
            Ok(f) => FontFace::Truetype(f),
            Err(e) => {
                warn!(error = %e, "font unavailable, using built-in fallback face");
                FontFace::Builtin
            }
        }
    }
}

/// A face ready for rasterization.
#[derive(Clone)]
pub enum FontFace {
    Truetype(Arc<Font<'static>>),
    /// Minimal 5x7 bitmap glyphs at a fixed small size. Lowercase maps to
    /// uppercase, anything outside the set renders as a tofu box.
    Builtin,
}

impl FontFace {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FontFace::Builtin)
    }
}

/// Horizontal advance of one built-in glyph cell (5 columns + 1 gap).
pub(crate) const BUILTIN_ADVANCE_PX: u32 = 6;

const TOFU: [u8; 7] = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

/// 5-bit-per-row bitmap for the built-in face, MSB = leftmost column.
pub(crate) fn builtin_glyph(ch: char) -> [u8; 7] {
    let ch = if ch.is_ascii_lowercase() {
        ch.to_ascii_uppercase()
    } else {
        ch
    };
    match ch {
        ' ' | '\u{3000}' => [0; 7],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x06, 0x06, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        _ => TOFU,
    }
}
