//! Flat in-memory file catalog.
//!
//! Files and directories live in fixed slot tables and are addressed by id.
//! Each directory threads its files and its subdirectories through singly
//! linked lists of ids; file contents sit in one flat data blob where every
//! file id owns a fixed partition.

pub mod catalog;
pub mod path;
mod table;

pub use catalog::{DirectoryEntry, FileEntry, FileSystem};
pub use path::{get_path_string, resolve_path};

use crate::constants::filesys::{
    FILE_TYPE_DIRECTORY, FILE_TYPE_REGULAR, MAX_FILENAME, PERM_EXECUTE, PERM_READ, PERM_WRITE,
};
use arrayvec::ArrayString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// The file or directory table, a file partition or a path buffer is full.
    CapacityExceeded,
    NotFound,
    /// The directory still holds files or subdirectories.
    NotEmpty,
    /// The id lies outside the table or names an entity that cannot be used here.
    InvalidId,
    InvalidName,
}

impl core::fmt::Display for FsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FsError::CapacityExceeded => write!(f, "No space left"),
            FsError::NotFound => write!(f, "No such file or directory"),
            FsError::NotEmpty => write!(f, "Directory not empty"),
            FsError::InvalidId => write!(f, "Invalid id"),
            FsError::InvalidName => write!(f, "Invalid name"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl DirId {
    /// The root directory, which always exists.
    pub const ROOT: DirId = DirId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for FileId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Display for DirId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
}

impl FileType {
    pub fn code(self) -> u32 {
        match self {
            FileType::Regular => FILE_TYPE_REGULAR,
            FileType::Directory => FILE_TYPE_DIRECTORY,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            FILE_TYPE_REGULAR => Some(FileType::Regular),
            FILE_TYPE_DIRECTORY => Some(FileType::Directory),
            _ => None,
        }
    }
}

/// Stored with every file. Nothing checks them on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilePermissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

impl FilePermissions {
    pub const READ_ONLY: Self = Self {
        readable: true,
        writable: false,
        executable: false,
    };
    pub const READ_WRITE: Self = Self {
        readable: true,
        writable: true,
        executable: false,
    };
    pub const READ_EXECUTE: Self = Self {
        readable: true,
        writable: false,
        executable: true,
    };

    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.readable {
            bits |= PERM_READ;
        }
        if self.writable {
            bits |= PERM_WRITE;
        }
        if self.executable {
            bits |= PERM_EXECUTE;
        }
        bits
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            readable: bits & PERM_READ != 0,
            writable: bits & PERM_WRITE != 0,
            executable: bits & PERM_EXECUTE != 0,
        }
    }
}

impl core::fmt::Display for FilePermissions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.readable, 'r'),
            flag(self.writable, 'w'),
            flag(self.executable, 'x')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File(FileId),
    Directory(DirId),
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: ArrayString<MAX_FILENAME>,
    pub kind: EntryKind,
    /// Bytes stored; always 0 for directories.
    pub size: usize,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory(_))
    }
}
