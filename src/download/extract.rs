//! Zip extraction for archived tools

use std::path::Path;

use zip::ZipArchive;

use crate::error::InstallError;

/// Extract `archive` into `destination`, replacing whatever was there.
///
/// Runs on the blocking pool; returns the names of the extracted entries.
pub async fn extract_zip(archive: &Path, destination: &Path) -> Result<Vec<String>, InstallError> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();
    let archive_for_err = archive.clone();

    tokio::task::spawn_blocking(move || extract_blocking(&archive, &destination))
        .await
        .map_err(|e| InstallError::Extract {
            archive: archive_for_err,
            message: format!("extraction task failed: {e}"),
        })?
}

fn extract_blocking(archive: &Path, destination: &Path) -> Result<Vec<String>, InstallError> {
    let zip_err = |e: zip::result::ZipError| InstallError::Extract {
        archive: archive.to_path_buf(),
        message: e.to_string(),
    };
    let io_err = |context: String| {
        move |source| InstallError::Io { context, source }
    };

    if destination.exists() {
        std::fs::remove_dir_all(destination).map_err(io_err(format!(
            "Failed to clear {}",
            destination.display()
        )))?;
    }
    std::fs::create_dir_all(destination).map_err(io_err(format!(
        "Failed to create {}",
        destination.display()
    )))?;

    let file = std::fs::File::open(archive)
        .map_err(io_err(format!("Failed to open {}", archive.display())))?;
    let mut zip = ZipArchive::new(file).map_err(zip_err)?;
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    zip.extract(destination).map_err(zip_err)?;

    Ok(names)
}
