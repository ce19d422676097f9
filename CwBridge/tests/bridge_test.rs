use cwbridge::prelude::*;
use std::env::consts::DLL_SUFFIX;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_verify_path_missing_directory() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("CodeWalker");

    assert!(!verify_path(&missing));
    match inspect_path(&missing) {
        Err(Error::InvalidConfiguration { problem, path }) => {
            assert_eq!(problem, PathProblem::NotADirectory);
            assert_eq!(path, missing);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_verify_path_missing_component() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("CodeWalker.exe"), b"MZ").unwrap();

    assert!(!verify_path(dir.path()));
    match inspect_path(dir.path()) {
        Err(Error::InvalidConfiguration { problem, path }) => {
            assert_eq!(problem, PathProblem::ComponentMissing);
            assert_eq!(path, dir.path().join(component_file_name()));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_verify_path_rejects_file_and_empty_path() {
    let dir = tempdir().unwrap();
    let component = dir.path().join(component_file_name());
    fs::write(&component, b"not a library").unwrap();

    assert!(!verify_path(&component));
    assert!(!verify_path(""));
}

#[test]
fn test_verify_path_accepts_component_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(component_file_name()), b"not a library").unwrap();

    assert!(verify_path(dir.path()));
    // Verification is repeatable and has no side effects.
    assert!(verify_path(dir.path()));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_component_file_name_uses_platform_convention() {
    let name = component_file_name();
    let name = name.to_string_lossy();
    assert!(name.contains(COMPONENT_NAME));
    assert!(name.ends_with(DLL_SUFFIX));
}

#[test]
fn test_open_fails_explicitly_on_bad_root() {
    let dir = tempdir().unwrap();

    let err = LibraryBridge::open(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfiguration {
            problem: PathProblem::ComponentMissing,
            ..
        }
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_open_reports_loader_failure() {
    let dir = tempdir().unwrap();
    let component = dir.path().join(component_file_name());
    fs::write(&component, b"this is not a shared object").unwrap();
    // A broken allow-listed dependency is declined, not raised.
    fs::write(dir.path().join(format!("SharpDX{DLL_SUFFIX}")), b"garbage").unwrap();

    match LibraryBridge::open(dir.path()) {
        Err(Error::LibraryLoad { path, message }) => {
            assert_eq!(path, component);
            assert!(!message.is_empty());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_resolver_never_touches_unlisted_files() {
    let dir = tempdir().unwrap();
    let evil = dir.path().join(format!("Evil{DLL_SUFFIX}"));
    fs::write(&evil, b"garbage").unwrap();

    let resolver = DependencyResolver::new(dir.path(), AllowList::default());
    for identifier in [
        "Evil",
        "Evil, Version=1.0.0.0",
        "Evil,SharpDX",
        " Evil , Culture=neutral",
    ] {
        assert_eq!(resolver.candidate(identifier), None, "{identifier}");
        assert!(resolver.resolve(identifier).is_none(), "{identifier}");
    }
}

#[test]
fn test_resolver_declines_broken_or_missing_dependency() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(format!("SharpDX{DLL_SUFFIX}")), b"garbage").unwrap();

    let resolver = DependencyResolver::new(dir.path(), AllowList::default());
    assert_eq!(
        resolver.candidate("SharpDX, Version=4.2.0.0, Culture=neutral"),
        Some(dir.path().join(format!("SharpDX{DLL_SUFFIX}")))
    );
    assert!(resolver.resolve("SharpDX, Version=4.2.0.0, Culture=neutral").is_none());
    assert!(resolver.resolve("SharpDX.Mathematics").is_none());
    assert!(resolver.preload().is_empty());
}

/// Install some unrelated system library under the component's file name.
///
/// Returns `false` when none of the usual locations has one.
#[cfg(target_os = "linux")]
fn install_foreign_component(root: &std::path::Path) -> bool {
    const CANDIDATES: [&str; 6] = [
        "/lib/x86_64-linux-gnu/libm.so.6",
        "/usr/lib/x86_64-linux-gnu/libm.so.6",
        "/lib/aarch64-linux-gnu/libm.so.6",
        "/usr/lib/aarch64-linux-gnu/libm.so.6",
        "/lib64/libm.so.6",
        "/usr/lib64/libm.so.6",
    ];
    match CANDIDATES.iter().map(std::path::Path::new).find(|path| path.is_file()) {
        Some(library) => {
            fs::copy(library, root.join(component_file_name())).unwrap();
            true
        }
        None => false,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_loaded_library_without_codec_types() {
    let dir = tempdir().unwrap();
    if !install_foreign_component(dir.path()) {
        eprintln!("no system libm found, skipping");
        return;
    }

    let bridge = LibraryBridge::open(dir.path()).unwrap();
    assert_eq!(bridge.root(), dir.path());
    assert!(bridge.lookup_type("GameFiles.RelFile").is_none());
    assert!(bridge.lookup_type("Interop").is_none());

    match bridge.require_type("GameFiles.XmlRel") {
        Err(Error::TypeNotFound { type_name }) => {
            assert_eq!(type_name, "CodeWalker.GameFiles.XmlRel");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    match NativeCodec::bind(&bridge) {
        Err(err @ Error::TypeNotFound { .. }) => {
            assert!(err.is_fatal());
            assert!(matches!(
                err,
                Error::TypeNotFound { ref type_name } if type_name == "CodeWalker.GameFiles.RelFile"
            ));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
