//! System call numbers, outcomes and the dispatcher.

pub mod syscall_handlers;

pub use syscall_handlers::dispatch_syscall;

use crate::{
    constants::syscalls::{SYSCALL_EXEC, SYSCALL_EXIT, SYSCALL_FORK, SYSCALL_READ, SYSCALL_WRITE},
    KernelError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Syscall {
    Write = SYSCALL_WRITE,
    Read = SYSCALL_READ,
    Exit = SYSCALL_EXIT,
    Fork = SYSCALL_FORK,
    Exec = SYSCALL_EXEC,
}

impl TryFrom<u32> for Syscall {
    type Error = u32;

    fn try_from(number: u32) -> Result<Self, u32> {
        match number {
            SYSCALL_WRITE => Ok(Syscall::Write),
            SYSCALL_READ => Ok(Syscall::Read),
            SYSCALL_EXIT => Ok(Syscall::Exit),
            SYSCALL_FORK => Ok(Syscall::Fork),
            SYSCALL_EXEC => Ok(Syscall::Exec),
            other => Err(other),
        }
    }
}

/// What the kernel hands back to the caller of a syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// The call succeeded with this result value.
    Completed(u64),
    NotImplemented(Syscall),
    /// The call number is not part of the ABI.
    Unknown(u32),
    Failed(KernelError),
}
