//! PDF engine trait and the Typst-backed implementation.

use std::sync::Arc;

use tracing::{debug, error, warn};
use typst::diag::{SourceDiagnostic, Warned};
use typst::model::Document;
use typst::utils::LazyHash;
use typst::Library;
use typst_pdf::PdfOptions;

use crate::error::RenderError;

use super::fonts::FontCache;
use super::world::RenderWorld;
use super::CompileJob;

/// Memoization entries older than this many compilations are evicted.
const COMEMO_MAX_AGE: usize = 10;

// =============================================================================
// PdfEngine Trait
// =============================================================================

/// Something that can turn a [`CompileJob`] into PDF bytes.
///
/// `compile` is blocking and may be CPU-heavy; callers on an async runtime
/// should run it on a blocking thread. Implementations must not share mutable
/// state between jobs.
pub trait PdfEngine: Send + Sync + 'static {
    /// Compile the job and return the PDF bytes.
    fn compile(&self, job: CompileJob) -> Result<Vec<u8>, RenderError>;
}

// =============================================================================
// TypstEngine
// =============================================================================

/// [`PdfEngine`] backed by the Typst compiler.
///
/// Only immutable resources (fonts and the standard library) live here; the
/// mutable part of a compilation is a [`RenderWorld`] built per job.
#[derive(Clone)]
pub struct TypstEngine {
    fonts: Arc<FontCache>,
    library: Arc<LazyHash<Library>>,
}

impl TypstEngine {
    /// Create an engine using the given fonts.
    pub fn new(fonts: FontCache) -> Self {
        Self {
            fonts: Arc::new(fonts),
            library: Arc::new(LazyHash::new(Library::builder().build())),
        }
    }

    /// The fonts this engine compiles with.
    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    fn compile_document(&self, world: &RenderWorld<'_>) -> Result<Document, RenderError> {
        let Warned { output, warnings } = typst::compile(world);

        for warning in &warnings {
            debug!("Typst warning: {}", describe(world, warning));
        }

        output.map_err(|diagnostics| {
            let message = diagnostics
                .iter()
                .filter(|d| d.severity == typst::diag::Severity::Error)
                .map(|d| describe(world, d))
                .collect::<Vec<_>>()
                .join("; ");
            RenderError::Compilation { message }
        })
    }
}

impl Default for TypstEngine {
    fn default() -> Self {
        Self::new(FontCache::new())
    }
}

impl PdfEngine for TypstEngine {
    fn compile(&self, job: CompileJob) -> Result<Vec<u8>, RenderError> {
        let world = RenderWorld::new(job, &self.fonts, &self.library);

        let result = self.compile_document(&world).and_then(|document| {
            debug!(pages = document.pages.len(), "Compiled document");
            typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|diagnostics| {
                RenderError::Export {
                    message: diagnostics
                        .iter()
                        .map(|d| describe(&world, d))
                        .collect::<Vec<_>>()
                        .join("; "),
                }
            })
        });

        comemo::evict(COMEMO_MAX_AGE);

        match &result {
            Ok(pdf) => debug!(bytes = pdf.len(), "Exported PDF"),
            Err(RenderError::Compilation { message }) => {
                warn!(root = ?world.root(), "Typst compilation failed: {}", message)
            }
            Err(e) => error!(root = ?world.root(), "Typst engine error: {}", e),
        }

        result
    }
}

/// Render a diagnostic as `path: message (hint: ...)`.
fn describe(world: &RenderWorld<'_>, diagnostic: &SourceDiagnostic) -> String {
    let mut text = match diagnostic.span.id() {
        Some(id) => format!("{}: {}", world.display_path(id), diagnostic.message),
        None => diagnostic.message.to_string(),
    };

    for hint in &diagnostic.hints {
        text.push_str(" (hint: ");
        text.push_str(hint);
        text.push(')');
    }

    text
}
