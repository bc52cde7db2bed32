//! Per-request implementation of the Typst `World` trait.
//!
//! A [`RenderWorld`] is the compiler's entire view of the outside: which file
//! is the main document, where other files come from, which fonts exist and
//! what time it is. It is built for one [`CompileJob`] and thrown away.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};

use super::fonts::FontCache;
use super::{CompileJob, MAIN_PATH};

/// Compilation environment for a single job.
pub struct RenderWorld<'a> {
    /// Directory files are read from; `None` for inline jobs
    root: Option<PathBuf>,
    /// Id of the main document
    main: FileId,
    /// Main document supplied inline rather than read from `root`
    inline_main: Option<Source>,
    /// In-memory overrides, checked before the filesystem
    shadows: HashMap<FileId, Bytes>,
    /// Files read so far, so one compilation sees a consistent snapshot
    files: Mutex<HashMap<FileId, FileResult<Bytes>>>,
    /// Parsed sources read so far
    sources: Mutex<HashMap<FileId, FileResult<Source>>>,
    fonts: &'a FontCache,
    library: &'a LazyHash<Library>,
    /// Compile start time, reported by `datetime.today()`
    now: DateTime<Utc>,
}

impl<'a> RenderWorld<'a> {
    /// Build the world for `job`.
    pub fn new(job: CompileJob, fonts: &'a FontCache, library: &'a LazyHash<Library>) -> Self {
        let main = FileId::new(None, VirtualPath::new(MAIN_PATH));

        let (root, inline_main, shadows) = match job {
            CompileJob::Inline { content } => (None, Some(Source::new(main, content)), HashMap::new()),
            CompileJob::Template { root, shadow } => {
                let mut shadows = HashMap::new();
                if let Some(shadow) = shadow {
                    let id = FileId::new(None, VirtualPath::new(&shadow.path));
                    shadows.insert(id, Bytes::from(shadow.content));
                }
                (Some(root), None, shadows)
            }
        };

        Self {
            root,
            main,
            inline_main,
            shadows,
            files: Mutex::new(HashMap::new()),
            sources: Mutex::new(HashMap::new()),
            fonts,
            library,
            now: Utc::now(),
        }
    }

    /// The compilation root, if this world can read files.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Human-readable path of a file, for diagnostics.
    pub fn display_path(&self, id: FileId) -> String {
        id.vpath().as_rootless_path().display().to_string()
    }

    fn read(&self, id: FileId) -> FileResult<Bytes> {
        let not_found = || FileError::NotFound(id.vpath().as_rootless_path().into());

        // Package imports would need a network fetch; they are unavailable.
        if id.package().is_some() {
            return Err(not_found());
        }
        let Some(root) = &self.root else {
            return Err(not_found());
        };

        // `resolve` refuses paths that climb out of the root.
        let path = id.vpath().resolve(root).ok_or(FileError::AccessDenied)?;
        if path.is_dir() {
            return Err(FileError::IsDirectory);
        }

        std::fs::read(&path)
            .map(Bytes::from)
            .map_err(|e| FileError::from_io(e, &path))
    }
}

impl World for RenderWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        self.fonts.book()
    }

    fn main(&self) -> FileId {
        self.main
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main {
            if let Some(source) = &self.inline_main {
                return Ok(source.clone());
            }
        }

        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = sources.get(&id) {
            return cached.clone();
        }

        let result = self.file(id).and_then(|bytes| {
            let text = std::str::from_utf8(&bytes).map_err(|_| FileError::InvalidUtf8)?;
            let text = text.strip_prefix('\u{feff}').unwrap_or(text);
            Ok(Source::new(id, text.to_string()))
        });
        sources.insert(id, result.clone());
        result
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        if let Some(bytes) = self.shadows.get(&id) {
            return Ok(bytes.clone());
        }
        if id == self.main {
            if let Some(source) = &self.inline_main {
                return Ok(Bytes::from(source.text().as_bytes().to_vec()));
            }
        }

        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = files.get(&id) {
            return cached.clone();
        }

        let result = self.read(id);
        files.insert(id, result.clone());
        result
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.font(index)
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        // Offsets come from user markup; out-of-range ones yield no date
        let offset = Duration::try_hours(offset.unwrap_or(0))?;
        let adjusted = self.now.checked_add_signed(offset)?;

        Datetime::from_ymd_hms(
            adjusted.year(),
            adjusted.month() as u8,
            adjusted.day() as u8,
            adjusted.hour() as u8,
            adjusted.minute() as u8,
            adjusted.second() as u8,
        )
    }
}
