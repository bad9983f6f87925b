//! Byte storage behind the page pool.

use crate::{constants::memory::PAGE_SIZE, memory::MemoryError};
use alloc::{boxed::Box, sync::Arc, vec};
use spin::Mutex;
use x86_64::{structures::paging::PhysFrame, PhysAddr};

/// Physical memory shared between the kernel and running task bodies.
pub type SharedMemory = Arc<Mutex<PhysicalMemory>>;

/// Zero-initialised memory covering the whole page pool, addressed by
/// absolute physical address.
pub struct PhysicalMemory {
    base: u64,
    bytes: Box<[u8]>,
}

impl PhysicalMemory {
    pub fn new(base: u64, total_pages: usize) -> Self {
        Self {
            base,
            bytes: vec![0u8; total_pages * PAGE_SIZE as usize].into_boxed_slice(),
        }
    }

    pub fn shared(base: u64, total_pages: usize) -> SharedMemory {
        Arc::new(Mutex::new(Self::new(base, total_pages)))
    }

    /// Validates that `[address, address + length)` lies in the pool and
    /// returns its offset into the backing bytes.
    fn offset(&self, address: u64, length: usize) -> Result<usize, MemoryError> {
        let offset = address
            .checked_sub(self.base)
            .ok_or(MemoryError::OutOfRange(address))? as usize;
        match offset.checked_add(length) {
            Some(end) if end <= self.bytes.len() => Ok(offset),
            _ => Err(MemoryError::OutOfRange(address)),
        }
    }

    pub fn read(&self, address: PhysAddr, length: usize) -> Result<&[u8], MemoryError> {
        let offset = self.offset(address.as_u64(), length)?;
        Ok(&self.bytes[offset..offset + length])
    }

    pub fn write(&mut self, address: PhysAddr, data: &[u8]) -> Result<(), MemoryError> {
        let offset = self.offset(address.as_u64(), data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn zero_frame(&mut self, frame: PhysFrame) -> Result<(), MemoryError> {
        let offset = self.offset(frame.start_address().as_u64(), PAGE_SIZE as usize)?;
        self.bytes[offset..offset + PAGE_SIZE as usize].fill(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::memory::MEMORY_START;

    #[test]
    fn read_back_written_bytes() {
        let mut memory = PhysicalMemory::new(MEMORY_START, 4);
        let addr = PhysAddr::new(MEMORY_START + PAGE_SIZE + 10);
        memory.write(addr, b"hello").unwrap();
        assert_eq!(memory.read(addr, 5).unwrap(), b"hello");
    }

    #[test]
    fn accesses_outside_the_pool_fail() {
        let mut memory = PhysicalMemory::new(MEMORY_START, 1);
        assert_eq!(
            memory.read(PhysAddr::new(0x1000), 1),
            Err(MemoryError::OutOfRange(0x1000))
        );
        let last = PhysAddr::new(MEMORY_START + PAGE_SIZE - 2);
        assert!(memory.write(last, b"ab").is_ok());
        assert!(memory.write(last, b"abc").is_err());
    }

    #[test]
    fn zeroing_a_frame_clears_it() {
        let mut memory = PhysicalMemory::new(MEMORY_START, 2);
        let frame = PhysFrame::containing_address(PhysAddr::new(MEMORY_START + PAGE_SIZE));
        memory.write(frame.start_address() + 7u64, &[0xAA; 16]).unwrap();
        memory.zero_frame(frame).unwrap();
        assert!(memory
            .read(frame.start_address(), PAGE_SIZE as usize)
            .unwrap()
            .iter()
            .all(|&b| b == 0));
    }
}
