//! Loading of the `CodeWalker.Core` component and name-based lookups into it
//!
//! The bridge is the only owner of the loaded component. Types are looked up
//! by dotted name under the [`NAMESPACE`] prefix; members are then resolved on
//! a [`NamedType`] as typed function pointers (see [`crate::invoker`]).
#![allow(unsafe_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{Error, PathProblem, Result};
use crate::invoker::Member;
use crate::resolver::{AllowList, DependencyResolver};

/// Base name of the codec component.
pub const COMPONENT_NAME: &str = "CodeWalker.Core";

/// Namespace every looked-up type lives under.
pub const NAMESPACE: &str = "CodeWalker";

/// Platform file name of the component (`CodeWalker.Core.dll`,
/// `libCodeWalker.Core.so`, ...).
#[must_use]
pub fn component_file_name() -> OsString {
    libloading::library_filename(COMPONENT_NAME)
}

/// Check that `path` is a directory directly containing the component.
///
/// Returns the component's path on success.
pub fn inspect_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidConfiguration {
            path: path.to_path_buf(),
            problem: PathProblem::Empty,
        });
    }
    if !path.is_dir() {
        return Err(Error::InvalidConfiguration {
            path: path.to_path_buf(),
            problem: PathProblem::NotADirectory,
        });
    }

    let component = path.join(component_file_name());
    if !component.is_file() {
        return Err(Error::InvalidConfiguration {
            path: component,
            problem: PathProblem::ComponentMissing,
        });
    }
    Ok(component)
}

/// Whether `path` is a usable library root. No side effects.
#[must_use]
pub fn verify_path<P: AsRef<Path>>(path: P) -> bool {
    inspect_path(path).is_ok()
}

/// Full dotted name for a type under [`NAMESPACE`].
#[must_use]
pub fn qualified_name(dotted: &str) -> String {
    format!("{NAMESPACE}.{dotted}")
}

/// Exported symbol stem for a full dotted name.
#[must_use]
pub fn symbol_stem(full_name: &str) -> String {
    full_name.replace('.', "_")
}

/// The loaded component plus the dependencies it was linked against.
pub struct LibraryBridge {
    root: PathBuf,
    // Dropped before the dependencies it binds to.
    component: Library,
    dependencies: Vec<Library>,
}

impl std::fmt::Debug for LibraryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryBridge")
            .field("root", &self.root)
            .field("dependencies", &self.dependencies.len())
            .finish_non_exhaustive()
    }
}

impl LibraryBridge {
    /// Load the component from `root` with the default dependency allow-list.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `root` fails [`verify_path`], `LibraryLoad`
    /// if the platform loader rejects the component.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::open_with(root, AllowList::default())
    }

    /// Load the component from `root`, satisfying its dependencies from
    /// `allowed`.
    pub fn open_with<P: AsRef<Path>>(root: P, allowed: AllowList) -> Result<Self> {
        let root = root.as_ref();
        let component_path = inspect_path(root)?;

        let resolver = DependencyResolver::new(root, allowed);
        let dependencies = resolver.preload();
        tracing::debug!(
            "Resolved {} of {} dependencies from {}",
            dependencies.len(),
            resolver.allow_list().len(),
            root.display()
        );

        tracing::info!("Loading {}", component_path.display());
        // SAFETY: the component was verified to be the expected file in the
        // configured root; loading it runs its initialisers.
        let component = unsafe { open_component(&component_path) }.map_err(|e| {
            Error::LibraryLoad {
                path: component_path.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            component,
            dependencies,
        })
    }

    /// The verified library root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a type by dotted name (e.g. `GameFiles.RelFile`).
    ///
    /// Returns `None` if the component does not export it.
    #[must_use]
    pub fn lookup_type(&self, dotted: &str) -> Option<NamedType<'_>> {
        let full_name = qualified_name(dotted);
        let stem = symbol_stem(&full_name);

        // SAFETY: the marker is only checked for presence, never read.
        let found = unsafe { self.component.get::<*const u8>(stem.as_bytes()) }.is_ok();
        if !found {
            tracing::debug!("Type {full_name} not exported");
            return None;
        }

        Some(NamedType {
            library: &self.component,
            dotted: dotted.to_string(),
            full_name,
            stem,
        })
    }

    /// Like [`lookup_type`](Self::lookup_type), but absence is an error.
    pub fn require_type(&self, dotted: &str) -> Result<NamedType<'_>> {
        self.lookup_type(dotted).ok_or_else(|| Error::TypeNotFound {
            type_name: qualified_name(dotted),
        })
    }
}

#[cfg(unix)]
unsafe fn open_component(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    // Bind everything up front so a broken install fails here, not mid-batch.
    // SAFETY: forwarded from the caller.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(windows)]
unsafe fn open_component(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::windows::{
        LOAD_LIBRARY_SEARCH_DEFAULT_DIRS, LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR, Library as WinLibrary,
    };

    // SAFETY: forwarded from the caller.
    unsafe {
        WinLibrary::load_with_flags(
            path,
            LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR | LOAD_LIBRARY_SEARCH_DEFAULT_DIRS,
        )
    }
    .map(Library::from)
}

/// A type exported by the component.
#[derive(Debug, Clone)]
pub struct NamedType<'lib> {
    library: &'lib Library,
    dotted: String,
    full_name: String,
    stem: String,
}

impl<'lib> NamedType<'lib> {
    /// Name relative to [`NAMESPACE`], as passed to `lookup_type`.
    #[must_use]
    pub fn dotted_name(&self) -> &str {
        &self.dotted
    }

    /// Fully qualified dotted name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Exported symbol name of member `member`.
    #[must_use]
    pub fn member_symbol(&self, member: &str) -> String {
        format!("{}__{member}", self.stem)
    }

    /// Resolve member `name` as a function pointer of type `F`.
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the member's real
    /// signature; calling through a mismatched signature is undefined
    /// behaviour.
    #[must_use]
    pub unsafe fn member<F: Copy>(&self, name: &str) -> Option<Member<'lib, F>> {
        let symbol = self.member_symbol(name);
        // SAFETY: the signature is vouched for by the caller.
        match unsafe { self.library.get::<F>(symbol.as_bytes()) } {
            Ok(found) => Some(Member::new(&self.dotted, name, *found)),
            Err(_) => {
                tracing::debug!("Member {symbol} not exported");
                None
            }
        }
    }

    /// Like [`member`](Self::member), but absence is an error.
    ///
    /// # Safety
    /// Same contract as [`member`](Self::member).
    pub unsafe fn require_member<F: Copy>(&self, name: &str) -> Result<Member<'lib, F>> {
        // SAFETY: forwarded from the caller.
        unsafe { self.member(name) }.ok_or_else(|| Error::MemberNotFound {
            type_name: self.full_name.clone(),
            member: name.to_string(),
        })
    }
}
