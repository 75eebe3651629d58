use std::path::{Path, PathBuf};
use std::sync::Arc;

use usvg::fontdb;

use crate::foundation::error::{VanimError, VanimResult};

/// Parses keyframe SVGs against one shared font database.
///
/// The database holds the system fonts plus any `.ttf`/`.otf`/`.ttc` found in the clip
/// directory and its `fonts/` subdirectory. Relative `href`s resolve against the directory of
/// the SVG being parsed.
#[derive(Clone)]
pub struct SvgLoader {
    fontdb: Arc<fontdb::Database>,
}

impl SvgLoader {
    /// Loader with the system fonts and the fonts shipped next to a clip in `clip_dir`.
    pub fn new(clip_dir: Option<&Path>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = clip_dir {
            load_fonts_from_dir(&mut db, dir);
            load_fonts_from_dir(&mut db, &dir.join("fonts"));
        }
        tracing::trace!(faces = db.len(), "svg font database ready");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Number of font faces available to `<text>`.
    pub fn font_faces(&self) -> usize {
        self.fontdb.len()
    }

    /// Parse SVG bytes; relative references resolve against `resources_dir`.
    pub fn parse(&self, bytes: &[u8], resources_dir: Option<&Path>) -> VanimResult<Arc<usvg::Tree>> {
        let opts = usvg::Options {
            resources_dir: resources_dir.map(Path::to_path_buf),
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(bytes, &opts)
            .map_err(|e| VanimError::decode(format!("parse svg tree: {e}")))?;
        Ok(Arc::new(tree))
    }

    /// Read and parse the SVG file at `path`.
    pub fn read(&self, path: &Path) -> VanimResult<Arc<usvg::Tree>> {
        let bytes = std::fs::read(path)
            .map_err(|e| VanimError::decode(format!("read svg '{}': {e}", path.display())))?;
        let dir = path.parent().map(PathBuf::from);
        self.parse(&bytes, dir.as_deref())
            .map_err(|e| VanimError::decode(format!("'{}': {e}", path.display())))
    }
}

fn load_fonts_from_dir(db: &mut fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };
    for path in rd.flatten().map(|e| e.path()) {
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"));
        if is_font
            && path.is_file()
            && let Err(e) = db.load_font_file(&path)
        {
            tracing::debug!(font = %path.display(), error = %e, "skipping font file");
        }
    }
}

/// Resolve the requested families first, then generic families, then any face at all, so text
/// never silently disappears while a font is installed.
fn font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, db| {
            let mut families: Vec<fontdb::Family<'_>> =
                font.families().iter().map(family).collect();
            families.extend([
                fontdb::Family::SansSerif,
                fontdb::Family::Serif,
                fontdb::Family::Monospace,
            ]);
            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: stretch(font.stretch()),
                style: style(font.style()),
            };
            db.query(&query).or_else(|| db.faces().next().map(|f| f.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

fn family(f: &usvg::FontFamily) -> fontdb::Family<'_> {
    match f {
        usvg::FontFamily::Serif => fontdb::Family::Serif,
        usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
        usvg::FontFamily::Cursive => fontdb::Family::Cursive,
        usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
        usvg::FontFamily::Monospace => fontdb::Family::Monospace,
        usvg::FontFamily::Named(name) => fontdb::Family::Name(name),
    }
}

fn stretch(s: usvg::FontStretch) -> fontdb::Stretch {
    use usvg::FontStretch as S;
    match s {
        S::UltraCondensed => fontdb::Stretch::UltraCondensed,
        S::ExtraCondensed => fontdb::Stretch::ExtraCondensed,
        S::Condensed => fontdb::Stretch::Condensed,
        S::SemiCondensed => fontdb::Stretch::SemiCondensed,
        S::Normal => fontdb::Stretch::Normal,
        S::SemiExpanded => fontdb::Stretch::SemiExpanded,
        S::Expanded => fontdb::Stretch::Expanded,
        S::ExtraExpanded => fontdb::Stretch::ExtraExpanded,
        S::UltraExpanded => fontdb::Stretch::UltraExpanded,
    }
}

fn style(s: usvg::FontStyle) -> fontdb::Style {
    match s {
        usvg::FontStyle::Normal => fontdb::Style::Normal,
        usvg::FontStyle::Italic => fontdb::Style::Italic,
        usvg::FontStyle::Oblique => fontdb::Style::Oblique,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/svg_load.rs"]
mod tests;
