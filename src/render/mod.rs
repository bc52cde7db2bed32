//! Compilation layer.
//!
//! Turns Typst markup into PDF bytes. The HTTP layer only sees the
//! [`PdfEngine`] trait; [`TypstEngine`] is the production implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ CompileJob (spawn_blocking)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TypstEngine                │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  FontCache   │  │  Library        │  │
//! │  │  (shared,    │  │  (shared,       │  │
//! │  │   immutable) │  │   immutable)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │ one per request
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             RenderWorld                 │
//! │  (root dir, main file, shadow files)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A new [`RenderWorld`] is built for every job and dropped afterwards, so
//! concurrent requests never share mutable compiler state.

mod engine;
mod fonts;
mod world;

pub use engine::{PdfEngine, TypstEngine};
pub use fonts::FontCache;
pub use world::RenderWorld;

use std::path::PathBuf;

/// Virtual path of the main document in both compile modes.
pub const MAIN_PATH: &str = "/main.typ";

/// An in-memory replacement for one file in the compilation root.
///
/// The file on disk (if any) is never read or written; the compiler sees
/// `content` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowFile {
    /// Virtual path relative to the compilation root (e.g. `/data.json`)
    pub path: String,

    /// Bytes the compiler will observe for `path`
    pub content: Vec<u8>,
}

/// A single unit of work for a [`PdfEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileJob {
    /// Compile markup supplied inline, with no filesystem access.
    Inline {
        /// Main document source
        content: String,
    },

    /// Compile `main.typ` from a template directory.
    Template {
        /// Directory used as the compilation root
        root: PathBuf,

        /// File overridden in memory for this job only
        shadow: Option<ShadowFile>,
    },
}

impl CompileJob {
    /// Create an inline job.
    pub fn inline(content: impl Into<String>) -> Self {
        CompileJob::Inline {
            content: content.into(),
        }
    }

    /// Create a template job rooted at `root`.
    pub fn template(root: impl Into<PathBuf>) -> Self {
        CompileJob::Template {
            root: root.into(),
            shadow: None,
        }
    }

    /// Override `path` with `content` for this job.
    ///
    /// Has no effect on inline jobs, which cannot read files.
    pub fn with_shadow(mut self, path: impl Into<String>, content: Vec<u8>) -> Self {
        if let CompileJob::Template { shadow, .. } = &mut self {
            *shadow = Some(ShadowFile {
                path: path.into(),
                content,
            });
        }
        self
    }

    /// The shadowed file, if any.
    pub fn shadow(&self) -> Option<&ShadowFile> {
        match self {
            CompileJob::Template { shadow, .. } => shadow.as_ref(),
            CompileJob::Inline { .. } => None,
        }
    }
}
