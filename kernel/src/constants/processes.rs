pub const MAX_PROCESSES: usize = 10;
pub const MAX_PROCESS_NAME: usize = 31;

pub const STACK_SIZE: usize = 4096; // one page per process

/// Entry address given to the boot shell process.
pub const SHELL_ENTRY: u64 = 0x2000;
