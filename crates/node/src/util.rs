//! Path helpers for the config file and the storage directory.
#![warn(missing_docs)]

use std::path::Path;
use std::path::PathBuf;

use crate::error::Error;

/// Resolve a leading `~` to the home directory. Other paths are returned as given.
pub fn expand_home<P>(path: P) -> Result<PathBuf, Error>
where P: AsRef<Path> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => home::home_dir()
            .map(|home| home.join(rest))
            .ok_or(Error::HomeDirError),
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Make sure the directory a config file is written into exists.
pub fn ensure_parent_dir<P>(path: P) -> Result<(), Error>
where P: AsRef<Path> {
    let path = expand_home(path)?;
    let parent = path.parent().ok_or(Error::ParentDirError)?;
    // a bare file name lives in the working directory
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|e| Error::CreateFileError(e.to_string()))
}
