//! Typst world shared by the renderer and the PDF assembler
//!
//! Provides the Typst compiler with access to:
//! - The generated Typst source code
//! - Fonts bundled with typst-kit (plus optional system or directory fonts)
//! - In-memory files such as rasterized page bands

use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;
use typst::diag::{FileError, FileResult, SourceDiagnostic};
use typst::foundations::{Bytes, Datetime};
use typst::layout::PagedDocument;
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};
use typst_kit::fonts::{FontSearcher, FontSlot};

/// Font loading errors
#[derive(Error, Debug)]
pub enum FontError {
    #[error("No fonts could be loaded")]
    NoFonts,
}

/// Static library instance (created once, reused)
static LIBRARY: OnceLock<LazyHash<Library>> = OnceLock::new();

/// Get or create the standard library
fn get_library() -> &'static LazyHash<Library> {
    LIBRARY.get_or_init(|| LazyHash::new(Library::builder().build()))
}

/// Fonts available to the layout engine
///
/// Loading is expensive, so one store is shared by every export.
pub struct FontStore {
    book: LazyHash<FontBook>,
    fonts: Vec<FontSlot>,
}

impl FontStore {
    /// Discover fonts
    ///
    /// The fonts embedded in typst-kit are always available, which keeps
    /// output identical across machines unless system fonts are requested.
    ///
    /// # Parameters
    /// * `include_system_fonts` - Also search the fonts installed on the host
    /// * `font_dirs` - Extra directories to search for font files
    pub fn load(include_system_fonts: bool, font_dirs: &[PathBuf]) -> Result<Self, FontError> {
        let fonts = FontSearcher::new()
            .include_system_fonts(include_system_fonts)
            .search_with(font_dirs.iter());

        if fonts.fonts.is_empty() {
            return Err(FontError::NoFonts);
        }

        log::debug!("Loaded {} font faces", fonts.fonts.len());

        Ok(Self {
            book: LazyHash::new(fonts.book),
            fonts: fonts.fonts,
        })
    }

    /// Number of font faces in the store
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether the store holds no font faces
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Whether any face of `family` was found (case-insensitive)
    pub fn has_family(&self, family: &str) -> bool {
        self.book
            .families()
            .any(|(name, _)| name.eq_ignore_ascii_case(family))
    }
}

impl fmt::Debug for FontStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontStore")
            .field("faces", &self.fonts.len())
            .finish()
    }
}

/// A single compilation unit: one Typst source plus its in-memory files
pub struct LayoutWorld<'a> {
    /// The main Typst source file
    main_source: Source,
    /// Shared fonts
    fonts: &'a FontStore,
    /// In-memory files addressable from the source
    files: HashMap<FileId, Bytes>,
}

impl<'a> LayoutWorld<'a> {
    /// Create a world whose main file holds the given markup
    pub fn new(markup: String, fonts: &'a FontStore) -> Self {
        let main_id = FileId::new(None, VirtualPath::new("main.typ"));
        Self {
            main_source: Source::new(main_id, markup),
            fonts,
            files: HashMap::new(),
        }
    }

    /// Make a file available to the source under `path` (relative to the root)
    pub fn add_file(&mut self, path: &str, data: Vec<u8>) {
        let file_id = FileId::new(None, VirtualPath::new(path));
        self.files.insert(file_id, Bytes::new(data));
    }

    /// Compile the main source into a paged document
    ///
    /// # Returns
    /// * `Ok(PagedDocument)` - The laid-out document
    /// * `Err(String)` - All compiler errors, one `location: message` per line
    pub fn compile(&self) -> Result<PagedDocument, String> {
        let result = typst::compile::<PagedDocument>(self);

        for warning in &result.warnings {
            log::debug!(
                "Typst warning at {}: {}",
                format_error_location(warning, self),
                warning.message
            );
        }

        result.output.map_err(|errors| {
            errors
                .iter()
                .map(|e| format!("{}: {}", format_error_location(e, self), e.message))
                .join("\n")
        })
    }
}

impl World for LayoutWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        get_library()
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.fonts.book
    }

    fn main(&self) -> FileId {
        self.main_source.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main_source.id() {
            Ok(self.main_source.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        self.files
            .get(&id)
            .cloned()
            .ok_or_else(|| FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.fonts.get(index)?.get()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        // Output must not depend on the current date
        None
    }
}

/// Format error location from a Typst source diagnostic
fn format_error_location(error: &SourceDiagnostic, world: &LayoutWorld<'_>) -> String {
    let Some(id) = error.span.id() else {
        return "unknown".to_string();
    };

    let Ok(source) = World::source(world, id) else {
        return id.vpath().as_rootless_path().display().to_string();
    };

    let Some(range) = source.range(error.span) else {
        return id.vpath().as_rootless_path().display().to_string();
    };

    let line = source.byte_to_line(range.start).unwrap_or(0) + 1;
    let col = source.byte_to_column(range.start).unwrap_or(0) + 1;
    format!(
        "{}:{}:{}",
        id.vpath().as_rootless_path().display(),
        line,
        col
    )
}
