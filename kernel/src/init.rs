//! Kernel bring-up: configuration and the boot sequence.

use crate::{
    constants::memory::{MAX_PAGES, MAX_POOL_PAGES, MEMORY_START, PAGE_SIZE, RESERVED_PAGES},
    devices::{Console, KeyboardBuffer},
    filesys::FileSystem,
    kernel::Kernel,
    memory::{BitmapPageAllocator, PhysicalMemory},
    processes::{ProcessTable, Scheduler},
    KernelError,
};
use alloc::{boxed::Box, format, sync::Arc};
use log::LevelFilter;
use x86_64::PhysAddr;

/// Boot-time configuration. Defaults come from `constants`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Physical address of the first page in the pool.
    pub memory_start: u64,
    pub total_pages: usize,
    /// Leading pages held by the kernel image; never handed out.
    pub reserved_pages: usize,
    pub log_level: LevelFilter,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            memory_start: MEMORY_START,
            total_pages: MAX_PAGES,
            reserved_pages: RESERVED_PAGES,
            #[cfg(debug_assertions)]
            log_level: LevelFilter::Debug,
            #[cfg(not(debug_assertions))]
            log_level: LevelFilter::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The pool must start at a non-zero, page-aligned address.
    InvalidStart(u64),
    EmptyPool,
    /// The pool is over `MAX_POOL_PAGES` or does not fit in the physical
    /// address space.
    PoolTooLarge { total_pages: usize },
    ReservationTooLarge { reserved: usize, total: usize },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::InvalidStart(addr) => write!(f, "Invalid memory start {:#X}", addr),
            ConfigError::EmptyPool => write!(f, "Page pool is empty"),
            ConfigError::PoolTooLarge { total_pages } => {
                write!(f, "Page pool of {} pages is too large", total_pages)
            }
            ConfigError::ReservationTooLarge { reserved, total } => write!(
                f,
                "Cannot reserve {} of {} pages",
                reserved, total
            ),
        }
    }
}

impl KernelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_start == 0 || self.memory_start % PAGE_SIZE != 0 {
            return Err(ConfigError::InvalidStart(self.memory_start));
        }
        if self.total_pages == 0 {
            return Err(ConfigError::EmptyPool);
        }
        let end = (self.total_pages as u64)
            .checked_mul(PAGE_SIZE)
            .and_then(|size| size.checked_add(self.memory_start));
        if self.total_pages > MAX_POOL_PAGES
            || end.and_then(|end| PhysAddr::try_new(end).ok()).is_none()
        {
            return Err(ConfigError::PoolTooLarge {
                total_pages: self.total_pages,
            });
        }
        if self.reserved_pages >= self.total_pages {
            return Err(ConfigError::ReservationTooLarge {
                reserved: self.reserved_pages,
                total: self.total_pages,
            });
        }
        Ok(())
    }
}

/// Brings the kernel up: page allocator, process table, file system, in
/// that order. Progress is reported on `console`.
pub fn init(config: KernelConfig, console: Box<dyn Console>) -> Result<Kernel, KernelError> {
    config.validate()?;
    log::set_max_level(config.log_level);

    let filesystem = FileSystem::init()?;
    let mut kernel = Kernel {
        allocator: BitmapPageAllocator::new(
            config.memory_start,
            config.total_pages,
            config.reserved_pages,
        ),
        memory: PhysicalMemory::shared(config.memory_start, config.total_pages),
        processes: ProcessTable::new(),
        scheduler: Scheduler::new(),
        filesystem,
        console,
        keyboard: Arc::new(KeyboardBuffer::new()),
    };
    kernel.console.write_str("minos kernel starting\n");
    kernel.console.write_str("Memory management initialized\n");
    kernel.console.write_str("Process management initialized\n");

    kernel.console.write_str("File system initialized\n");

    let summary = format!(
        "{} of {} pages free\n",
        kernel.allocator.free_pages(),
        kernel.allocator.total_pages()
    );
    kernel.console.write_str(&summary);
    kernel.console.write_str("Kernel initialization complete\n");
    log::info!("kernel initialized with {:?}", config);

    Ok(kernel)
}
