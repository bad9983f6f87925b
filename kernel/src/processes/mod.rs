//! Process table, cooperative round-robin scheduler and task bodies.

pub mod process;
pub mod scheduler;
pub mod task;

pub use process::{Pid, Process, ProcessState, ProcessTable};
pub use scheduler::{Scheduler, Tick};
pub use task::{SyscallFuture, SyscallGate, SyscallRequest, YieldNow};

use crate::memory::MemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Every process slot is occupied.
    TableFull,
    /// No page was available for the new process's stack.
    StackAllocation(MemoryError),
    NoSuchProcess(Pid),
    /// A per-process operation was requested while no process is current.
    NoCurrentProcess,
}

impl core::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProcessError::TableFull => write!(f, "Process table full"),
            ProcessError::StackAllocation(err) => write!(f, "Stack allocation failed: {}", err),
            ProcessError::NoSuchProcess(pid) => write!(f, "No process with pid {}", pid),
            ProcessError::NoCurrentProcess => write!(f, "No current process"),
        }
    }
}
