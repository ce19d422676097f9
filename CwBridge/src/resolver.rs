//! Dependency resolution for the codec component
//!
//! The component links against a couple of sibling libraries shipped in its
//! own directory. Those are not on any loader search path, so they are
//! satisfied here from an allow-list of file names, before the component
//! itself is loaded. Nothing outside the allow-list is ever opened.
#![allow(unsafe_code)]

use std::collections::BTreeSet;
use std::env::consts::DLL_SUFFIX;
use std::path::{Path, PathBuf};

use libloading::Library;

/// Dependencies `CodeWalker.Core` needs next to it.
pub const DEFAULT_DEPENDENCIES: [&str; 2] = ["SharpDX", "SharpDX.Mathematics"];

/// Derive the file name to look for from a requested component identifier.
///
/// Composite identifiers (`Name, Version=..., Culture=...`) are cut at the
/// first comma; the platform's library suffix is appended either way.
#[must_use]
pub fn dependency_file_name(identifier: &str) -> String {
    let base = identifier
        .split_once(',')
        .map_or(identifier, |(name, _)| name)
        .trim();
    format!("{base}{DLL_SUFFIX}")
}

/// Immutable set of dependency file names the resolver may load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    files: BTreeSet<String>,
}

impl AllowList {
    /// Build an allow-list from bare identifiers (suffix is added here).
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            files: identifiers
                .into_iter()
                .map(|id| dependency_file_name(id.as_ref()))
                .collect(),
        }
    }

    /// Whether `file_name` may be loaded.
    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.files.contains(file_name)
    }

    /// Allowed file names, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_DEPENDENCIES)
    }
}

/// Satisfies dependency loads from one directory, restricted to an [`AllowList`].
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    folder: PathBuf,
    allowed: AllowList,
}

impl DependencyResolver {
    /// Create a resolver for `folder`.
    pub fn new<P: Into<PathBuf>>(folder: P, allowed: AllowList) -> Self {
        Self {
            folder: folder.into(),
            allowed,
        }
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allowed
    }

    /// The file `resolve` would try to load for `identifier`, or `None` if
    /// the request is declined by the allow-list.
    #[must_use]
    pub fn candidate(&self, identifier: &str) -> Option<PathBuf> {
        let file_name = dependency_file_name(identifier);
        self.candidate_file(&file_name)
    }

    fn candidate_file(&self, file_name: &str) -> Option<PathBuf> {
        if !self.allowed.contains(file_name) {
            tracing::debug!("Declining dependency {file_name}: not allow-listed");
            return None;
        }
        Some(self.folder.join(file_name))
    }

    /// Try to satisfy a load request for `identifier`.
    ///
    /// Every failure (not allow-listed, missing, wrong format, wrong
    /// architecture) is a decline, never an error: the caller's own
    /// resolution then fails in the usual way.
    #[must_use]
    pub fn resolve(&self, identifier: &str) -> Option<Library> {
        let path = self.candidate(identifier)?;
        load_dependency(&path)
    }

    /// Resolve every allow-listed dependency present in the folder.
    ///
    /// The returned handles must outlive the component that needs them.
    #[must_use]
    pub fn preload(&self) -> Vec<Library> {
        self.allowed
            .iter()
            .filter_map(|file_name| self.candidate_file(file_name))
            .filter_map(|path| load_dependency(&path))
            .collect()
    }
}

fn load_dependency(path: &Path) -> Option<Library> {
    if !path.is_file() {
        tracing::debug!("Declining dependency {}: file not present", path.display());
        return None;
    }

    // SAFETY: the file comes from the configured library root and is on the
    // allow-list; running its initialisers is the point of loading it.
    match unsafe { open_shared(path) } {
        Ok(library) => {
            tracing::debug!("Loaded dependency {}", path.display());
            Some(library)
        }
        Err(e) => {
            tracing::debug!("Declining dependency {}: {e}", path.display());
            None
        }
    }
}

/// Open a dependency so that later loads of the component can bind to it.
#[cfg(unix)]
unsafe fn open_shared(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};

    // SAFETY: forwarded from the caller.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }.map(Library::from)
}

/// Open a dependency so that later loads of the component can bind to it.
#[cfg(windows)]
unsafe fn open_shared(path: &Path) -> Result<Library, libloading::Error> {
    // SAFETY: forwarded from the caller.
    unsafe { Library::new(path) }
}
