// Syscall numbers
pub const SYSCALL_WRITE: u32 = 1;
pub const SYSCALL_READ: u32 = 2;
pub const SYSCALL_EXIT: u32 = 3;
pub const SYSCALL_FORK: u32 = 4;
pub const SYSCALL_EXEC: u32 = 5;
