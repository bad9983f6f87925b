//! The kernel context: owner of every kernel table.
//!
//! There is no global kernel state. Everything the scheduler, the syscall
//! dispatcher and the shell touch hangs off one `Kernel` value built by
//! [`crate::init::init`].

use crate::{
    devices::{Console, KeyboardBuffer},
    filesys::FileSystem,
    memory::{BitmapPageAllocator, SharedMemory},
    processes::{task::Task, Pid, ProcessTable, Scheduler, SyscallGate},
    KernelError,
};
use alloc::{boxed::Box, sync::Arc};
use core::future::Future;
use futures::FutureExt;

pub struct Kernel {
    pub(crate) allocator: BitmapPageAllocator,
    pub(crate) memory: SharedMemory,
    pub(crate) processes: ProcessTable,
    pub(crate) scheduler: Scheduler,
    pub(crate) filesystem: FileSystem,
    pub(crate) console: Box<dyn Console>,
    pub(crate) keyboard: Arc<KeyboardBuffer>,
}

impl Kernel {
    /// Creates a Ready process with a fresh, zeroed stack page and no body.
    pub fn create_process(&mut self, name: &str, entry: u64) -> Result<Pid, KernelError> {
        let pid = self
            .processes
            .create_process(&mut self.allocator, name, entry)?;

        if let Some(process) = self.processes.get(pid) {
            if let Err(err) = self.memory.lock().zero_frame(process.stack_frame) {
                log::error!("could not clear stack of process {}: {}", pid, err);
            }
        }
        Ok(pid)
    }

    /// Creates a process whose body is the future returned by `body`.
    pub fn spawn<F, Fut>(&mut self, name: &str, entry: u64, body: F) -> Result<Pid, KernelError>
    where
        F: FnOnce(SyscallGate) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pid = self.create_process(name, entry)?;
        let slot = self
            .processes
            .slot_of(pid)
            .ok_or(crate::processes::ProcessError::NoSuchProcess(pid))?;
        let stack = self.processes.slot(slot).map(|process| process.stack_frame);

        if let Some(stack) = stack {
            let gate = SyscallGate::new(pid, stack, self.memory.clone());
            let future = body(gate.clone()).boxed();
            self.scheduler.tasks[slot] = Some(Task::new(future, gate));
        }
        Ok(pid)
    }

    /// Marks a process Terminated; the scheduler reclaims it on its next tick.
    pub fn terminate(&mut self, pid: Pid) -> Result<(), KernelError> {
        self.processes.terminate(pid)?;
        Ok(())
    }

    pub fn allocator(&self) -> &BitmapPageAllocator {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut BitmapPageAllocator {
        &mut self.allocator
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn filesystem(&self) -> &FileSystem {
        &self.filesystem
    }

    pub fn filesystem_mut(&mut self) -> &mut FileSystem {
        &mut self.filesystem
    }

    pub fn console(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    pub fn keyboard(&self) -> &Arc<KeyboardBuffer> {
        &self.keyboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::MemoryConsole,
        init::{init, KernelConfig},
        memory::MemoryError,
        processes::{ProcessError, ProcessState},
    };
    use x86_64::PhysAddr;

    #[test]
    fn stack_pages_are_zeroed_on_creation() {
        let mut kernel = init(KernelConfig::default(), Box::new(MemoryConsole::new())).unwrap();

        let pid = kernel.create_process("first", 0).unwrap();
        let stack = kernel.processes().get(pid).unwrap().stack_frame;
        kernel
            .memory()
            .lock()
            .write(stack.start_address(), b"leftover")
            .unwrap();
        kernel.terminate(pid).unwrap();
        kernel.reap_terminated();

        let pid = kernel.create_process("second", 0).unwrap();
        assert_eq!(kernel.processes().get(pid).unwrap().stack_frame, stack);
        assert_eq!(
            kernel.memory().lock().read(stack.start_address(), 8).unwrap(),
            &[0u8; 8]
        );
    }

    #[test]
    fn spawn_fails_cleanly_when_memory_runs_out() {
        let config = KernelConfig {
            total_pages: 6,
            ..KernelConfig::default()
        };
        let mut kernel = init(config, Box::new(MemoryConsole::new())).unwrap();

        kernel.spawn("a", 0, |_| async {}).unwrap();
        kernel.spawn("b", 0, |_| async {}).unwrap();
        assert_eq!(
            kernel.spawn("c", 0, |_| async {}),
            Err(KernelError::Process(ProcessError::StackAllocation(
                MemoryError::Exhausted
            )))
        );
        assert_eq!(kernel.processes().len(), 2);
        assert!(kernel
            .processes()
            .iter()
            .all(|process| process.state() == ProcessState::Ready));
        assert!(!kernel.allocator().is_allocated(PhysAddr::new(0)));
    }
}
