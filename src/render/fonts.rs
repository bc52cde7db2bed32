//! Font loading.
//!
//! Fonts are loaded once at startup and shared read-only by every
//! compilation. The fonts bundled with `typst-assets` are always present so
//! output does not depend on what happens to be installed on the host.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use typst::foundations::Bytes;
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;

/// The fonts available to compilation.
pub struct FontCache {
    /// Metadata for every loaded font, indexed like `fonts`
    book: LazyHash<FontBook>,
    /// The font faces themselves
    fonts: Vec<Font>,
}

impl FontCache {
    /// Create a cache holding only the embedded fonts.
    pub fn new() -> Self {
        Self::with_dirs(&[])
    }

    /// Create a cache holding the embedded fonts plus every font found
    /// (recursively) under `dirs`.
    pub fn with_dirs(dirs: &[PathBuf]) -> Self {
        let mut book = FontBook::new();
        let mut fonts = Vec::new();

        for data in typst_assets::fonts() {
            push_fonts(Bytes::from_static(data), &mut book, &mut fonts);
        }
        let embedded = fonts.len();

        for dir in dirs {
            scan_font_dir(dir, &mut book, &mut fonts);
        }

        info!(
            embedded = embedded,
            extra = fonts.len() - embedded,
            "Font cache initialized with {} fonts",
            fonts.len()
        );

        Self {
            book: LazyHash::new(book),
            fonts,
        }
    }

    /// The font book.
    pub fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    /// Get a font by index.
    pub fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    /// Number of loaded fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether no fonts are loaded.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache")
            .field("fonts", &self.fonts.len())
            .finish()
    }
}

fn push_fonts(buffer: Bytes, book: &mut FontBook, fonts: &mut Vec<Font>) {
    for font in Font::iter(buffer) {
        book.push(font.info().clone());
        fonts.push(font);
    }
}

/// Recursively scan a directory for font files.
///
/// Symlinks to font files are loaded; symlinks to directories are skipped.
fn scan_font_dir(dir: &Path, book: &mut FontBook, fonts: &mut Vec<Font>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read font directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        // Symlinked directories are not followed
        if file_type.is_dir() {
            scan_font_dir(&path, book, fonts);
        } else if is_font_file(&path) {
            match std::fs::read(&path) {
                Ok(data) => {
                    debug!("Loading font {}", path.display());
                    push_fonts(Bytes::from(data), book, fonts);
                }
                Err(e) => warn!("Cannot read font {}: {}", path.display(), e),
            }
        }
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "ttf" | "otf" | "ttc" | "otc"))
}
