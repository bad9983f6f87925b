use crate::{
    constants::memory::{BITMAP_ENTRY_SIZE, FULL_BITMAP_ENTRY, PAGE_SIZE},
    memory::MemoryError,
};
use x86_64::{
    structures::paging::{FrameAllocator, FrameDeallocator, PhysFrame, Size4KiB},
    PhysAddr,
};

use alloc::{boxed::Box, vec};

/// First-fit page allocator over a fixed pool, one bit per page.
///
/// A set bit means the page is handed out (or reserved). Bits past the end of
/// the pool in the last word are kept set so the scan can never return them.
pub struct BitmapPageAllocator {
    base: u64,
    total_pages: usize,
    reserved_pages: usize,
    free_pages: usize,
    bitmap: Box<[u64]>,
}

impl BitmapPageAllocator {
    /// Creates an allocator for `total_pages` pages starting at `base`, with
    /// the first `reserved_pages` permanently marked as used.
    pub fn new(base: u64, total_pages: usize, reserved_pages: usize) -> Self {
        let bitmap_size = total_pages.div_ceil(BITMAP_ENTRY_SIZE);
        let mut bitmap = vec![0u64; bitmap_size].into_boxed_slice();

        let tail_bits = total_pages % BITMAP_ENTRY_SIZE;
        if tail_bits != 0 {
            bitmap[bitmap_size - 1] = FULL_BITMAP_ENTRY << tail_bits;
        }

        let mut allocator = Self {
            base,
            total_pages,
            reserved_pages: reserved_pages.min(total_pages),
            free_pages: total_pages,
            bitmap,
        };

        for page_index in 0..allocator.reserved_pages {
            allocator.set_bit(page_index);
        }

        log::debug!(
            "page pool at {:#X}: {} pages, {} reserved, bitmap of {} words",
            base,
            total_pages,
            allocator.reserved_pages,
            bitmap_size
        );

        allocator
    }

    /// Hands out the lowest free page.
    pub fn allocate_page(&mut self) -> Result<PhysAddr, MemoryError> {
        let found = self
            .bitmap
            .iter()
            .enumerate()
            .find(|(_, word)| **word != FULL_BITMAP_ENTRY)
            .map(|(word_index, word)| {
                word_index * BITMAP_ENTRY_SIZE + (!word).trailing_zeros() as usize
            });

        match found {
            Some(page_index) => {
                self.set_bit(page_index);
                Ok(self.page_address(page_index))
            }
            None => {
                log::warn!("page pool exhausted ({} pages)", self.total_pages);
                Err(MemoryError::Exhausted)
            }
        }
    }

    /// Returns a page to the pool.
    pub fn free_page(&mut self, address: PhysAddr) -> Result<(), MemoryError> {
        let page_index = self.page_index(address.as_u64())?;

        if page_index < self.reserved_pages {
            return Err(MemoryError::Reserved(address.as_u64()));
        }
        if !self.is_bit_set(page_index) {
            return Err(MemoryError::DoubleFree(address.as_u64()));
        }

        self.clear_bit(page_index);
        Ok(())
    }

    /// Whether the page containing `address` is allocated. Addresses outside
    /// the pool are never allocated.
    pub fn is_allocated(&self, address: PhysAddr) -> bool {
        self.is_raw_allocated(address.as_u64())
    }

    /// Whether every page touched by `[address, address + length)` is allocated.
    pub fn is_range_allocated(&self, address: PhysAddr, length: usize) -> bool {
        if length == 0 {
            return self.is_allocated(address);
        }
        let start = address.as_u64();
        let Some(end) = start.checked_add(length as u64 - 1) else {
            return false;
        };
        let first = start - start % PAGE_SIZE;

        (first..=end)
            .step_by(PAGE_SIZE as usize)
            .all(|page| self.is_raw_allocated(page))
    }

    pub fn free_pages(&self) -> usize {
        self.free_pages
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn base(&self) -> PhysAddr {
        PhysAddr::new(self.base)
    }

    fn is_raw_allocated(&self, address: u64) -> bool {
        self.contains(address) && self.is_bit_set(((address - self.base) / PAGE_SIZE) as usize)
    }

    fn contains(&self, address: u64) -> bool {
        address >= self.base && address - self.base < self.total_pages as u64 * PAGE_SIZE
    }

    /// Page index for a page-aligned address inside the pool.
    fn page_index(&self, address: u64) -> Result<usize, MemoryError> {
        if !self.contains(address) {
            return Err(MemoryError::OutOfRange(address));
        }
        let offset = address - self.base;
        if offset % PAGE_SIZE != 0 {
            return Err(MemoryError::Misaligned(address));
        }
        Ok((offset / PAGE_SIZE) as usize)
    }

    fn page_address(&self, page_index: usize) -> PhysAddr {
        PhysAddr::new(self.base + page_index as u64 * PAGE_SIZE)
    }

    /// set a particular bit (1), taking in page_index (usize)
    fn set_bit(&mut self, page_index: usize) {
        assert!(page_index < self.total_pages);

        let word_index = page_index / BITMAP_ENTRY_SIZE;
        let bit_index = page_index % BITMAP_ENTRY_SIZE;

        let mask = 1 << bit_index;
        self.bitmap[word_index] |= mask;
        self.free_pages -= 1;
    }

    /// clear a particular bit (0), taking in page_index (usize)
    fn clear_bit(&mut self, page_index: usize) {
        assert!(page_index < self.total_pages);

        let word_index = page_index / BITMAP_ENTRY_SIZE;
        let bit_index = page_index % BITMAP_ENTRY_SIZE;

        let mask = 1 << bit_index;
        self.bitmap[word_index] &= !mask;
        self.free_pages += 1;
    }

    fn is_bit_set(&self, page_index: usize) -> bool {
        assert!(page_index < self.total_pages);

        let word_index = page_index / BITMAP_ENTRY_SIZE;
        let bit_index = page_index % BITMAP_ENTRY_SIZE;

        let mask = 1 << bit_index;
        (self.bitmap[word_index] & mask) != 0
    }
}

unsafe impl FrameAllocator<Size4KiB> for BitmapPageAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        self.allocate_page().ok().map(PhysFrame::containing_address)
    }
}

impl FrameDeallocator<Size4KiB> for BitmapPageAllocator {
    unsafe fn deallocate_frame(&mut self, frame: PhysFrame<Size4KiB>) {
        if let Err(err) = self.free_page(frame.start_address()) {
            log::warn!("rejected frame deallocation: {}", err);
        }
    }
}
