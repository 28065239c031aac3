//! Locates the image file a rasterizer produced for a page.
//!
//! `pdftoppm` pads the page number differently depending on version and on
//! the document's page count (`page-1.png`, `page-01.png`, `page-001.png`),
//! and some builds drop the separator. Exact names are tried first, in a fixed
//! order, then two permissive directory scans.

use std::path::{Path, PathBuf};

/// Builds one exact candidate filename from (prefix, page, format).
pub type CandidateName = fn(&str, u32, &str) -> String;

/// Exact-name candidates, tried in order.
pub const EXACT_CANDIDATES: &[CandidateName] = &[
    unpadded,
    padded_two,
    padded_three,
    concatenated,
    concatenated_padded_two,
];

pub fn unpadded(prefix: &str, page: u32, format: &str) -> String {
    format!("{prefix}-{page}.{format}")
}

pub fn padded_two(prefix: &str, page: u32, format: &str) -> String {
    format!("{prefix}-{page:02}.{format}")
}

pub fn padded_three(prefix: &str, page: u32, format: &str) -> String {
    format!("{prefix}-{page:03}.{format}")
}

pub fn concatenated(prefix: &str, page: u32, format: &str) -> String {
    format!("{prefix}{page}.{format}")
}

pub fn concatenated_padded_two(prefix: &str, page: u32, format: &str) -> String {
    format!("{prefix}{page:02}.{format}")
}

/// Permissive fallback (a): `<prefix>-*.<format>` containing the page number.
pub fn matches_prefix_and_page(name: &str, prefix: &str, page: u32, format: &str) -> bool {
    matches_prefix(name, prefix, format) && name.contains(&page.to_string())
}

/// Permissive fallback (b): any `<prefix>-*.<format>`.
pub fn matches_prefix(name: &str, prefix: &str, format: &str) -> bool {
    name.starts_with(&format!("{prefix}-")) && name.ends_with(&format!(".{format}"))
}

/// Find the rasterized image for `page` in `dir`, or `None` when no plausible
/// candidate exists.
pub fn resolve_output(prefix: &str, page: u32, format: &str, dir: &Path) -> Option<PathBuf> {
    let names = list_file_names(dir);
    pick_candidate(&names, prefix, page, format).map(|name| dir.join(name))
}

/// Selection over an already listed, sorted set of names.
pub fn pick_candidate<'a>(
    names: &'a [String],
    prefix: &str,
    page: u32,
    format: &str,
) -> Option<&'a str> {
    for candidate in EXACT_CANDIDATES {
        let wanted = candidate(prefix, page, format);
        if let Some(found) = names.iter().find(|n| **n == wanted) {
            return Some(found.as_str());
        }
    }

    names
        .iter()
        .find(|n| matches_prefix_and_page(n, prefix, page, format))
        .or_else(|| names.iter().find(|n| matches_prefix(n, prefix, format)))
        .map(String::as_str)
}

fn list_file_names(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Cannot list output dir");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn candidate_builders_cover_padding_styles() {
        assert_eq!(unpadded("page", 7, "png"), "page-7.png");
        assert_eq!(padded_two("page", 7, "png"), "page-07.png");
        assert_eq!(padded_three("page", 7, "png"), "page-007.png");
        assert_eq!(concatenated("page", 7, "png"), "page7.png");
        assert_eq!(concatenated_padded_two("page", 7, "png"), "page07.png");
        assert_eq!(padded_three("page", 1234, "png"), "page-1234.png");
    }

    #[test]
    fn exact_unpadded_wins() {
        let n = names(&["page-3.png", "page-03.png"]);
        assert_eq!(pick_candidate(&n, "page", 3, "png"), Some("page-3.png"));
    }

    #[test]
    fn exact_candidates_are_tried_in_order() {
        let n = names(&["page-003.png", "page-03.png"]);
        assert_eq!(pick_candidate(&n, "page", 3, "png"), Some("page-03.png"));

        let n = names(&["page3.png", "page-003.png"]);
        assert_eq!(pick_candidate(&n, "page", 3, "png"), Some("page-003.png"));

        let n = names(&["page03.png", "page3.png"]);
        assert_eq!(pick_candidate(&n, "page", 3, "png"), Some("page3.png"));

        let n = names(&["page03.png"]);
        assert_eq!(pick_candidate(&n, "page", 3, "png"), Some("page03.png"));
    }

    #[test]
    fn falls_back_to_name_containing_page() {
        let n = names(&["page-x.png", "page-0003-r.png"]);
        assert_eq!(pick_candidate(&n, "page", 3, "png"), Some("page-0003-r.png"));
    }

    #[test]
    fn falls_back_to_any_prefixed_image() {
        let n = names(&["notes.txt", "page-final.png"]);
        assert_eq!(pick_candidate(&n, "page", 9, "png"), Some("page-final.png"));
    }

    #[test]
    fn ignores_other_formats_and_prefixes() {
        let n = names(&["page-1.ppm", "scan-1.png", "page1.jpg"]);
        assert_eq!(pick_candidate(&n, "page", 1, "png"), None);
    }

    #[test]
    fn resolves_against_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page-12.png"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("page-99.png")).unwrap();

        assert_eq!(
            resolve_output("page", 12, "png", dir.path()),
            Some(dir.path().join("page-12.png"))
        );
        // Directories never count as output files.
        assert_eq!(
            resolve_output("page", 99, "png", dir.path()),
            Some(dir.path().join("page-12.png"))
        );
    }

    #[test]
    fn missing_directory_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_output("page", 1, "png", &dir.path().join("gone")), None);
    }
}
