//! Location of the CodeWalker installation
//!
//! Stored as a single line in a `.cfg` file next to the executable. When the
//! stored path is missing or stale the operator is asked for a new one.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use cwbridge::bridge::{component_file_name, inspect_path};

use crate::error::{Error, Result};

/// Extension of the configuration file.
pub const CONFIG_EXTENSION: &str = "cfg";

/// The configuration file for the running executable.
pub fn config_file_path() -> io::Result<PathBuf> {
    Ok(std::env::current_exe()?.with_extension(CONFIG_EXTENSION))
}

/// Read the stored library root, if any.
pub fn read_library_path(config_file: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(config_file).ok()?;
    let line = content.lines().next()?.trim();
    (!line.is_empty()).then(|| PathBuf::from(line))
}

/// Overwrite the configuration file with `library_root`.
pub fn write_library_path(config_file: &Path, library_root: &Path) -> io::Result<()> {
    fs::write(config_file, library_root.to_string_lossy().as_bytes())
}

/// Expand `~` and surrounding whitespace in an operator-entered path.
pub fn expand_path(input: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(input.trim()).into_owned())
}

/// Ask for a library root until a valid one is given
///
/// Returns `None` when the operator enters an empty line or input ends.
pub fn prompt_library_path<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<PathBuf>> {
    loop {
        writeln!(
            output,
            "Provide the path to CodeWalker (needed for {}):",
            component_file_name().to_string_lossy()
        )?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }

        let candidate = expand_path(line);
        match inspect_path(&candidate) {
            Ok(_) => return Ok(Some(candidate)),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}

/// Work out which library root to use
///
/// An explicit `override_path` wins and must be valid; it is not persisted.
/// Otherwise the stored path is used if it still verifies, and failing that
/// the operator is prompted. A newly entered path is written back.
///
/// # Errors
/// `Bridge` if `override_path` is invalid, `NotConfigured` if the prompt
/// was abandoned.
pub fn resolve_library_path<R: BufRead, W: Write>(
    config_file: &Path,
    override_path: Option<&Path>,
    input: &mut R,
    output: &mut W,
) -> Result<PathBuf> {
    if let Some(path) = override_path {
        inspect_path(path)?;
        return Ok(path.to_path_buf());
    }

    let stored = read_library_path(config_file);
    if let Some(path) = &stored {
        match inspect_path(path) {
            Ok(_) => return Ok(path.clone()),
            Err(e) => writeln!(output, "{e}")?,
        }
    }

    let chosen = prompt_library_path(input, output)?.ok_or(Error::NotConfigured)?;
    if stored.as_ref() != Some(&chosen) {
        tracing::info!("Saving CodeWalker path to {}", config_file.display());
        write_library_path(config_file, &chosen)?;
    }
    Ok(chosen)
}
