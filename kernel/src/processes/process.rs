use crate::{
    constants::processes::{MAX_PROCESSES, MAX_PROCESS_NAME, STACK_SIZE},
    memory::BitmapPageAllocator,
    processes::ProcessError,
    truncated,
};
use arrayvec::ArrayString;
use x86_64::{structures::paging::PhysFrame, PhysAddr};

pub type Pid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

impl core::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(match self {
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Blocked => "blocked",
            ProcessState::Terminated => "terminated",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub(crate) state: ProcessState,
    pub name: ArrayString<MAX_PROCESS_NAME>,
    pub stack_frame: PhysFrame,
    /// Top of the stack page; stacks grow down.
    pub stack_pointer: PhysAddr,
    pub entry: u64,
}

impl Process {
    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Fixed array of process slots. An empty slot is `None`; pids are never reused.
pub struct ProcessTable {
    slots: [Option<Process>; MAX_PROCESSES],
    next_pid: Pid,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            next_pid: 1,
        }
    }

    /// Places a new Ready process in the first empty slot, with one freshly
    /// allocated page as its stack.
    pub fn create_process(
        &mut self,
        allocator: &mut BitmapPageAllocator,
        name: &str,
        entry: u64,
    ) -> Result<Pid, ProcessError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ProcessError::TableFull)?;

        let stack_base = allocator
            .allocate_page()
            .map_err(ProcessError::StackAllocation)?;
        let stack_frame = PhysFrame::containing_address(stack_base);

        let pid = self.next_pid;
        self.next_pid += 1;

        let process = Process {
            pid,
            state: ProcessState::Ready,
            name: truncated(name),
            stack_frame,
            stack_pointer: stack_frame.start_address() + STACK_SIZE as u64,
            entry,
        };
        log::info!(
            "created process {} ({}) in slot {}, stack {:?}, entry {:#X}",
            pid,
            process.name,
            index,
            stack_frame.start_address(),
            entry
        );
        self.slots[index] = Some(process);

        Ok(pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.iter().find(|process| process.pid == pid)
    }

    pub fn slot(&self, index: usize) -> Option<&Process> {
        self.slots.get(index)?.as_ref()
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Process> {
        self.slots.get_mut(index)?.as_mut()
    }

    pub fn slot_of(&self, pid: Pid) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(process) if process.pid == pid))
    }

    /// Marks a process Terminated. Its resources stay in place until the
    /// scheduler reclaims the slot.
    pub fn terminate(&mut self, pid: Pid) -> Result<(), ProcessError> {
        let index = self.slot_of(pid).ok_or(ProcessError::NoSuchProcess(pid))?;
        if let Some(process) = self.slots[index].as_mut() {
            process.state = ProcessState::Terminated;
        }
        Ok(())
    }

    /// Empties a slot and returns its stack page to the allocator.
    pub(crate) fn reclaim(
        &mut self,
        index: usize,
        allocator: &mut BitmapPageAllocator,
    ) -> Option<Process> {
        let process = self.slots.get_mut(index)?.take()?;
        if let Err(err) = allocator.free_page(process.stack_frame.start_address()) {
            log::error!("failed to free stack of process {}: {}", process.pid, err);
        }
        Some(process)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        MAX_PROCESSES
    }
}
