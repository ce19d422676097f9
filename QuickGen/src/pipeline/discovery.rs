//! Source file discovery

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use cwbridge::codec::Conversion;
use walkdir::WalkDir;

/// Whether `file_name` ends with `suffix`, ignoring ASCII case.
pub fn has_suffix(file_name: &str, suffix: &str) -> bool {
    file_name.len() >= suffix.len()
        && file_name.as_bytes()[file_name.len() - suffix.len()..]
            .eq_ignore_ascii_case(suffix.as_bytes())
}

fn matches(file_name: &OsStr, suffix: &str) -> bool {
    file_name.to_str().is_some_and(|name| has_suffix(name, suffix))
}

/// Find every file under `dir` (recursively) that `conversion` consumes
///
/// # Returns
/// A sorted list of paths, so runs over the same tree are reproducible.
pub fn find_source_files<P: AsRef<Path>>(dir: P, conversion: Conversion) -> Vec<PathBuf> {
    let suffix = conversion.source_suffix();

    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && matches(e.file_name(), suffix))
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    files
}
