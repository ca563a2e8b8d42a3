//! Shell-profile PATH store

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{InstallSettings, expand_path};
use crate::error::EnvError;

use super::PathStore;

const EXPORT_PREFIX: &str = "export PATH=\"$PATH:";

/// PATH persisted as `export PATH="$PATH:<dir>"` lines in a profile file.
///
/// The persisted value is the process PATH followed by every directory the
/// profile exports.
#[derive(Debug, Clone)]
pub struct ProfilePathStore {
    profile: PathBuf,
}

impl ProfilePathStore {
    pub fn new(profile: impl Into<PathBuf>) -> Self {
        Self {
            profile: profile.into(),
        }
    }

    /// Store for the configured profile file; `~` needs a home directory
    pub fn from_settings(settings: &InstallSettings) -> Result<Self, EnvError> {
        if settings.profile_file.starts_with('~') && dirs::home_dir().is_none() {
            return Err(EnvError::NoHome);
        }
        Ok(Self::new(expand_path(&settings.profile_file)))
    }

    pub fn profile(&self) -> &Path {
        &self.profile
    }

    /// Directories exported by lines this store understands
    pub fn exported_dirs(&self) -> Result<Vec<String>, EnvError> {
        let content = match std::fs::read_to_string(&self.profile) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(EnvError::Io {
                    path: self.profile.clone(),
                    source,
                });
            }
        };

        Ok(content
            .lines()
            .filter_map(|line| {
                line.trim()
                    .strip_prefix(EXPORT_PREFIX)
                    .and_then(|rest| rest.strip_suffix('"'))
                    .map(str::to_string)
            })
            .collect())
    }
}

impl PathStore for ProfilePathStore {
    fn read(&self) -> Result<Option<String>, EnvError> {
        let mut parts: Vec<String> = std::env::var("PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .into_iter()
            .collect();
        parts.extend(self.exported_dirs()?);

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join(":")))
        }
    }

    fn write(&self, entry: &str, _merged: &str) -> Result<(), EnvError> {
        let io_err = |source| EnvError::Io {
            path: self.profile.clone(),
            source,
        };

        if let Some(parent) = self.profile.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let needs_newline = std::fs::read(&self.profile)
            .map(|bytes| bytes.last().is_some_and(|&b| b != b'\n'))
            .unwrap_or(false);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.profile)
            .map_err(io_err)?;
        if needs_newline {
            writeln!(file).map_err(io_err)?;
        }
        writeln!(file, "{EXPORT_PREFIX}{entry}\"").map_err(io_err)?;

        Ok(())
    }

    fn broadcast(&self) -> Result<(), EnvError> {
        log::info!(
            "PATH change recorded in {}; new shells will pick it up",
            self.profile.display()
        );
        Ok(())
    }

    fn separator(&self) -> char {
        ':'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::add_to_path;
    use crate::progress::ProgressSink;

    #[test]
    fn appends_export_line_once() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join(".profile");
        std::fs::write(&profile, "alias ll='ls -l'").unwrap();
        let store = ProfilePathStore::new(&profile);
        let entry = dir.path().join("tools/bin").display().to_string();
        let sink = ProgressSink::silent();

        assert!(add_to_path(&store, &entry, &sink).unwrap());
        assert!(!add_to_path(&store, &entry, &sink).unwrap());

        let content = std::fs::read_to_string(&profile).unwrap();
        assert_eq!(
            content,
            format!("alias ll='ls -l'\nexport PATH=\"$PATH:{entry}\"\n")
        );
        assert_eq!(store.exported_dirs().unwrap(), vec![entry]);
    }

    #[test]
    fn missing_profile_reads_as_no_exports() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfilePathStore::new(dir.path().join("absent"));
        assert!(store.exported_dirs().unwrap().is_empty());
    }
}
