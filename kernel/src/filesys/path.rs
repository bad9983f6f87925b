//! Absolute path strings for directories and path lookup.

use crate::{
    constants::filesys::{MAX_PATH_LENGTH, ROOT_NAME},
    filesys::{DirId, FileSystem, FsError},
};
use alloc::{string::String, vec::Vec};

/// Absolute path of `dir`, built by walking parent links up to the root.
pub fn get_path_string(fs: &FileSystem, dir: DirId) -> Result<String, FsError> {
    let mut names = Vec::new();
    let mut current = dir;
    while current != DirId::ROOT {
        let entry = fs.directory(current)?;
        names.push(entry.name.as_str());
        current = entry.parent;
    }

    if names.is_empty() {
        return Ok(String::from(ROOT_NAME));
    }

    let mut path = String::new();
    for name in names.iter().rev() {
        path.push('/');
        path.push_str(name);
    }
    // one byte of the path buffer is kept for the terminator
    if path.len() > MAX_PATH_LENGTH - 1 {
        return Err(FsError::CapacityExceeded);
    }
    Ok(path)
}

/// Resolves `path` to a directory. Absolute paths start at the root and
/// relative ones at `from`; `.` and `..` are understood and the root is its
/// own parent.
pub fn resolve_path(fs: &FileSystem, from: DirId, path: &str) -> Result<DirId, FsError> {
    let mut current = if path.starts_with('/') {
        DirId::ROOT
    } else {
        fs.directory(from)?;
        from
    };

    for component in path.split('/') {
        current = match component {
            "" | "." => current,
            ".." => fs.directory(current)?.parent,
            name => fs.find_directory(name, current)?,
        };
    }
    Ok(current)
}
