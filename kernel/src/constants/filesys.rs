//! Catalog capacities.

pub const MAX_FILES: usize = 100;
pub const MAX_DIRECTORIES: usize = 50;
pub const MAX_FILE_SIZE: usize = 4096;

/// Longest stored name in bytes.
pub const MAX_FILENAME: usize = 31;
pub const MAX_PATH_LENGTH: usize = 128;

pub const ROOT_NAME: &str = "/";

// Permission bits
pub const PERM_READ: u32 = 1;
pub const PERM_WRITE: u32 = 2;
pub const PERM_EXECUTE: u32 = 4;

// File types
pub const FILE_TYPE_REGULAR: u32 = 1;
pub const FILE_TYPE_DIRECTORY: u32 = 2;

/// Images placed in the root directory at boot, in creation order.
pub const BOOT_FILES: [&str; 3] = ["kernel.bin", "shell.bin", "init.bin"];
