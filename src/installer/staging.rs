//! Executable staging: fallback copies and permission fixes

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::InstallError;

/// Copy `source` into `directory`, keeping its file name.
///
/// Returns `Ok(None)` without copying when `directory` does not exist: the
/// copy only makes sense for a directory that is already on PATH.
pub fn copy_into(source: &Path, directory: &Path) -> Result<Option<PathBuf>, InstallError> {
    if !directory.is_dir() {
        return Ok(None);
    }

    let file_name = source.file_name().ok_or_else(|| InstallError::Io {
        context: format!("Invalid executable path: {}", source.display()),
        source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
    })?;
    let dest_path = directory.join(file_name);

    fs::copy(source, &dest_path).map_err(|source_err| InstallError::Io {
        context: format!(
            "Failed to copy {} to {}",
            source.display(),
            dest_path.display()
        ),
        source: source_err,
    })?;
    make_executable(&dest_path)?;

    Ok(Some(dest_path))
}

/// Set mode 755 on Unix; a no-op elsewhere
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    let io_err = |context: &str| {
        let context = format!("{context}: {}", path.display());
        move |source| InstallError::Io { context, source }
    };

    let mut perms = fs::metadata(path)
        .map_err(io_err("Failed to read metadata"))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).map_err(io_err("Failed to set permissions"))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}
