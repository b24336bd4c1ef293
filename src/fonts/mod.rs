//! Font discovery for raster chart output.
//!
//! Text in the SVG document is converted to outlines before rasterization, which
//! needs a font database. Bundled fonts are searched first, then the system
//! fonts are added. A missing font only drops labels from raster output, so
//! every lookup failure is logged and never returned as an error.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use log::{debug, warn};
use resvg::usvg::fontdb::{Database, Family, Query};

/// Environment variable pointing at an extra font directory.
pub const FONTS_DIR_ENV: &str = "RADAR_REPORT_FONTS_DIR";

/// Family used for generic `sans-serif` text when the chart font is missing.
pub const FALLBACK_SANS_SERIF: &str = "DejaVu Sans";

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

/// Directories searched for bundled fonts, in priority order.
pub fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        candidates.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.iter().any(|existing| existing == &candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if !candidates
        .iter()
        .any(|existing| existing == &manifest_candidate)
    {
        candidates.push(manifest_candidate);
    }

    candidates
}

/// Builds a font database from the bundled directories and the system fonts.
pub fn load_font_database() -> Database {
    let mut database = Database::new();

    for candidate in font_directory_candidates() {
        if candidate.is_dir() {
            let before = database.len();
            database.load_fonts_dir(&candidate);
            debug!(
                "loaded {} fonts from {}",
                database.len() - before,
                candidate.display()
            );
        }
    }

    database.load_system_fonts();

    if database.is_empty() {
        warn!(
            "No fonts found (set {} to a font directory); chart labels are omitted from raster output.",
            FONTS_DIR_ENV
        );
    } else if !has_family(&database, "Arial") {
        debug!("Arial not available; sans-serif text falls back to '{FALLBACK_SANS_SERIF}'");
        database.set_sans_serif_family(FALLBACK_SANS_SERIF);
    }

    database
}

fn has_family(database: &Database, family: &str) -> bool {
    let query = Query {
        families: &[Family::Name(family)],
        ..Query::default()
    };
    database.query(&query).is_some()
}

/// Process-wide font database, loaded on first use.
pub fn font_database() -> &'static Database {
    static DATABASE: OnceLock<Database> = OnceLock::new();
    DATABASE.get_or_init(load_font_database)
}

/// Indicates whether any font is available for raster text.
pub fn fonts_available() -> bool {
    !font_database().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_directory_is_always_searched() {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
        assert!(font_directory_candidates().contains(&manifest));
    }
}
