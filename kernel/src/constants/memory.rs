pub const PAGE_SIZE: u64 = 4096;

/// Physical address of the first page in the pool. Address 0 is never part of the pool.
pub const MEMORY_START: u64 = 0x10_0000;
pub const MAX_PAGES: usize = 1024;

/// Largest pool `init` accepts. Every page is backed by host memory.
pub const MAX_POOL_PAGES: usize = 1 << 16;

/// Pages held back at boot for the kernel image.
pub const RESERVED_PAGES: usize = 4;

pub const BITMAP_ENTRY_SIZE: usize = 64;
pub const FULL_BITMAP_ENTRY: u64 = 0xFFFFFFFFFFFFFFFF;
