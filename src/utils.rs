//! Utility functions for file operations and path manipulation

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// True if `name` can be used as a single path component under the data directory.
///
/// Rejects empty names, `.`/`..`, and anything containing a path separator,
/// so record ids and shortcodes coming from requests can't escape their parent.
///
/// # Examples
///
/// ```
/// use media_syncer::utils::is_safe_component;
///
/// assert!(is_safe_component("recA1b2C3"));
/// assert!(!is_safe_component("../etc"));
/// assert!(!is_safe_component(""));
/// ```
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

/// Forward-slash relative path of `path` under `root`, or `None` if it is not below it.
///
/// Used both for archive entry names and for building asset URLs, which
/// must not depend on the platform separator.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Write `contents` to `path` through a sibling `.part` file, creating parent directories.
///
/// The final name only appears once the data is fully written, so an
/// existence check never sees a truncated file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Serialize `value` as pretty JSON to `path`
pub async fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json).await
}

/// Stamp a file's modification time with the post's original timestamp
pub fn set_modified_time(path: &Path, timestamp: DateTime<Utc>) -> Result<()> {
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_modified(SystemTime::from(timestamp))?;
    Ok(())
}
