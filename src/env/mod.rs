//! Persistent search-path store
//!
//! PATH changes are read-modify-write against a platform store:
//! - Windows: the machine `Environment` key in the registry
//! - Unix: `export PATH=...` lines in a shell profile
//!
//! An entry is only appended when the current value does not already contain
//! it as a substring, so repeated installs leave PATH unchanged.

use crate::error::EnvError;
use crate::progress::ProgressSink;

#[cfg(unix)]
mod profile;
#[cfg(windows)]
mod registry;

#[cfg(unix)]
pub use self::profile::ProfilePathStore;
#[cfg(windows)]
pub use self::registry::RegistryPathStore;

/// Store used by the binary on this platform
#[cfg(unix)]
pub type SystemPathStore = ProfilePathStore;
#[cfg(windows)]
pub type SystemPathStore = RegistryPathStore;

/// Where PATH survives the current process
pub trait PathStore {
    /// Current persistent value, `None` when nothing is stored yet
    fn read(&self) -> Result<Option<String>, EnvError>;

    /// Persist `merged`, which is the previous value with `entry` appended
    fn write(&self, entry: &str, merged: &str) -> Result<(), EnvError>;

    /// Tell running programs that the environment changed
    fn broadcast(&self) -> Result<(), EnvError>;

    fn separator(&self) -> char;
}

/// `current` with `entry` appended, or `None` when `current` already
/// contains it
pub fn merge_path(current: &str, entry: &str, separator: char) -> Option<String> {
    if current.contains(entry) {
        return None;
    }
    if current.is_empty() {
        return Some(entry.to_string());
    }
    Some(format!("{current}{separator}{entry}"))
}

/// Append `entry` to the persistent PATH unless already present.
///
/// Returns whether the store was modified. A failed broadcast is reported to
/// the sink and does not fail the call.
pub fn add_to_path<S: PathStore>(
    store: &S,
    entry: &str,
    sink: &ProgressSink,
) -> Result<bool, EnvError> {
    let current = store.read()?.unwrap_or_default();

    let Some(merged) = merge_path(&current, entry, store.separator()) else {
        sink.info(format!("{entry} is already in PATH"));
        return Ok(false);
    };

    store.write(entry, &merged)?;
    sink.success(format!("Added {entry} to PATH"));

    if let Err(e) = store.broadcast() {
        sink.warn(format!("Could not notify running programs of PATH change: {e}"));
    }

    Ok(true)
}
