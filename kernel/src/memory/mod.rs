//! Physical page management: the page bitmap and the memory behind it.

pub mod bitmap_page_allocator;
pub mod physical;

pub use bitmap_page_allocator::BitmapPageAllocator;
pub use physical::{PhysicalMemory, SharedMemory};

/// Failures of the page allocator and of physical memory accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Every page in the pool is in use.
    Exhausted,
    /// The address lies outside the page pool.
    OutOfRange(u64),
    /// The address is inside the pool but not on a page boundary.
    Misaligned(u64),
    /// The page belongs to the reserved kernel image.
    Reserved(u64),
    /// The page is not currently allocated.
    DoubleFree(u64),
}

impl core::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MemoryError::Exhausted => write!(f, "Page pool exhausted"),
            MemoryError::OutOfRange(addr) => write!(f, "Address {:#X} is outside the page pool", addr),
            MemoryError::Misaligned(addr) => write!(f, "Address {:#X} is not page aligned", addr),
            MemoryError::Reserved(addr) => write!(f, "Page {:#X} is reserved", addr),
            MemoryError::DoubleFree(addr) => write!(f, "Page {:#X} is not allocated", addr),
        }
    }
}
