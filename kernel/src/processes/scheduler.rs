//! Round-robin cooperative scheduler.
//!
//! Each tick reaps terminated processes, moves the cursor one slot forward and
//! runs the process under it if it is Ready. Nothing is preempted and no
//! register state exists: a process runs until its body reaches a yield point.

use crate::{
    constants::processes::MAX_PROCESSES,
    kernel::Kernel,
    processes::{task::Task, Pid, ProcessState},
    syscalls::{dispatch_syscall, SyscallOutcome},
};
use core::task::Poll;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The slot under the cursor held nothing runnable.
    Idle { slot: usize },
    Ran {
        slot: usize,
        pid: Pid,
        /// Outcome of the syscall the process raised during its turn, if any.
        syscall: Option<SyscallOutcome>,
    },
}

pub struct Scheduler {
    cursor: usize,
    pub(crate) current: Option<usize>,
    pub(crate) tasks: [Option<Task>; MAX_PROCESSES],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            // the first tick lands on slot 0
            cursor: MAX_PROCESSES - 1,
            current: None,
            tasks: core::array::from_fn(|_| None),
        }
    }

    fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % MAX_PROCESSES;
        self.cursor
    }
}

impl Kernel {
    /// One scheduler iteration.
    pub fn tick(&mut self) -> Tick {
        self.reap_terminated();

        let slot = self.scheduler.advance();
        let pid = match self.processes.slot_mut(slot) {
            Some(process) if process.state == ProcessState::Ready => {
                process.state = ProcessState::Running;
                process.pid
            }
            _ => return Tick::Idle { slot },
        };
        self.scheduler.current = Some(slot);
        log::trace!("switched to process {} in slot {}", pid, slot);

        let mut syscall = None;
        if let Some(task) = self.scheduler.tasks[slot].as_mut() {
            let gate = task.gate.clone();
            match task.poll() {
                Poll::Ready(()) => {
                    log::debug!("process {} returned from its body", pid);
                    if let Some(process) = self.processes.slot_mut(slot) {
                        process.state = ProcessState::Terminated;
                    }
                }
                Poll::Pending => {
                    if let Some((ticket, request)) = gate.take_request() {
                        let outcome = dispatch_syscall(self, request.number, request.args);
                        gate.complete(ticket, outcome);
                        syscall = Some(outcome);
                    }
                }
            }
        }

        if let Some(process) = self.processes.slot_mut(slot) {
            if process.state == ProcessState::Running {
                process.state = ProcessState::Ready;
            }
        }
        self.scheduler.current = None;

        Tick::Ran { slot, pid, syscall }
    }

    /// Tears down every Terminated process: drops its body, frees its stack
    /// page and empties its slot. Returns how many were reclaimed.
    pub fn reap_terminated(&mut self) -> usize {
        let mut reaped = 0;
        for slot in 0..MAX_PROCESSES {
            let terminated = matches!(
                self.processes.slot(slot),
                Some(process) if process.state == ProcessState::Terminated
            );
            if !terminated {
                continue;
            }

            self.scheduler.tasks[slot] = None;
            if self.scheduler.current == Some(slot) {
                self.scheduler.current = None;
            }
            if let Some(process) = self.processes.reclaim(slot, &mut self.allocator) {
                log::info!("reaped process {} ({})", process.pid, process.name);
                reaped += 1;
            }
        }
        reaped
    }

    /// Ticks until no process is left or `max_ticks` have run. Returns the
    /// number of ticks taken.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        for ticks in 0..max_ticks {
            self.reap_terminated();
            if self.processes.is_empty() {
                return ticks;
            }
            self.tick();
        }
        max_ticks
    }

    /// Pid of the process whose turn is in progress. `None` between ticks.
    pub fn current_pid(&self) -> Option<Pid> {
        let slot = self.scheduler.current?;
        self.processes.slot(slot).map(|process| process.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::syscalls::{SYSCALL_EXIT, SYSCALL_FORK},
        syscalls::Syscall,
        devices::MemoryConsole,
        init::{init, KernelConfig},
        processes::ProcessError,
        KernelError,
    };
    use alloc::{boxed::Box, vec::Vec};
    use futures::FutureExt;

    fn kernel() -> (Kernel, MemoryConsole) {
        let console = MemoryConsole::new();
        let kernel = init(KernelConfig::default(), Box::new(console.clone())).unwrap();
        console.clear_transcript();
        (kernel, console)
    }

    #[test]
    fn round_robin_over_slots() {
        let (mut kernel, _) = kernel();
        let pids: Vec<Pid> = (0..3)
            .map(|_| kernel.create_process("idle", 0).unwrap())
            .collect();

        let mut order = Vec::new();
        for _ in 0..(2 * MAX_PROCESSES) {
            if let Tick::Ran { pid, .. } = kernel.tick() {
                order.push(pid);
            }
        }
        assert_eq!(order, [pids.clone(), pids].concat());
    }

    #[test]
    fn processes_return_to_ready_after_their_turn() {
        let (mut kernel, _) = kernel();
        let pid = kernel.create_process("idle", 0).unwrap();

        assert!(matches!(kernel.tick(), Tick::Ran { pid: ran, .. } if ran == pid));
        assert_eq!(kernel.current_pid(), None);
        assert_eq!(
            kernel.processes().get(pid).unwrap().state(),
            ProcessState::Ready
        );
    }

    #[test]
    fn blocked_processes_are_skipped() {
        let (mut kernel, _) = kernel();
        let pid = kernel.create_process("waiting", 0).unwrap();
        let slot = kernel.processes().slot_of(pid).unwrap();
        kernel.processes.slot_mut(slot).unwrap().state = ProcessState::Blocked;

        for _ in 0..MAX_PROCESSES {
            assert!(matches!(kernel.tick(), Tick::Idle { .. }));
        }
    }

    #[test]
    fn exit_reclaims_slot_for_reuse() {
        let (mut kernel, _) = kernel();
        let pid = kernel
            .spawn("quitter", 0, |gate| async move {
                gate.exit().await;
            })
            .unwrap();
        for _ in 1..MAX_PROCESSES {
            kernel.create_process("worker", 0).unwrap();
        }
        assert_eq!(
            kernel.create_process("extra", 0),
            Err(KernelError::Process(ProcessError::TableFull))
        );

        let stack = kernel.processes().get(pid).unwrap().stack_frame;
        assert_eq!(
            kernel.tick(),
            Tick::Ran {
                slot: 0,
                pid,
                syscall: Some(SyscallOutcome::Completed(0))
            }
        );
        assert_eq!(
            kernel.processes().get(pid).unwrap().state(),
            ProcessState::Terminated
        );

        kernel.tick();
        assert!(kernel.processes().get(pid).is_none());
        assert!(!kernel.allocator().is_allocated(stack.start_address()));

        let replacement = kernel.create_process("extra", 0).unwrap();
        assert_eq!(replacement, MAX_PROCESSES as Pid + 1);
        assert_eq!(kernel.processes().get(replacement).unwrap().stack_frame, stack);
    }

    #[test]
    fn task_prints_and_exits() {
        let (mut kernel, console) = kernel();
        let free_before = kernel.allocator().free_pages();

        kernel
            .spawn("greeter", 0x4000, |gate| async move {
                gate.print("hello from ").await;
                gate.print("a task\n").await;
                gate.exit().await;
            })
            .unwrap();

        let ticks = kernel.run(100);
        assert!(ticks < 100);
        assert_eq!(console.transcript(), "hello from a task\n");
        assert!(kernel.processes().is_empty());
        assert_eq!(kernel.allocator().free_pages(), free_before);
    }

    #[test]
    fn tasks_interleave_at_syscalls() {
        let (mut kernel, console) = kernel();
        for name in ["a", "b"] {
            kernel
                .spawn(name, 0, move |gate| async move {
                    for _ in 0..2 {
                        gate.print(name).await;
                    }
                })
                .unwrap();
        }

        kernel.run(100);
        assert_eq!(console.transcript(), "abab");
        assert!(kernel.processes().is_empty());
    }

    #[test]
    fn unimplemented_syscalls_report_back_to_the_task() {
        let (mut kernel, _) = kernel();
        kernel
            .spawn("forker", 0, |gate| async move {
                let outcome = gate.syscall(SYSCALL_FORK, [0; 3]).await;
                assert!(matches!(outcome, SyscallOutcome::NotImplemented(_)));
            })
            .unwrap();

        assert!(matches!(
            kernel.tick(),
            Tick::Ran {
                syscall: Some(SyscallOutcome::NotImplemented(_)),
                ..
            }
        ));
        kernel.run(20);
        assert!(kernel.processes().is_empty());
    }

    #[test]
    fn abandoned_syscall_does_not_answer_the_next_one() {
        let (mut kernel, console) = kernel();
        let outcome = alloc::sync::Arc::new(spin::Mutex::new(None));
        let seen = outcome.clone();
        kernel
            .spawn("impatient", 0, move |gate| async move {
                assert!(gate.syscall(SYSCALL_FORK, [0; 3]).now_or_never().is_none());
                gate.yield_now().await;
                *seen.lock() = Some(gate.syscall(0xBEEF, [0; 3]).await);
            })
            .unwrap();

        kernel.run(100);
        assert_eq!(*outcome.lock(), Some(SyscallOutcome::Unknown(0xBEEF)));
        assert_eq!(console.transcript(), "Unknown system call: 0x0000BEEF\n");
        assert!(kernel.processes().is_empty());
    }

    #[test]
    fn exit_between_turns_has_no_current_process() {
        let (mut kernel, _) = kernel();
        let pid = kernel.create_process("idle", 0).unwrap();
        kernel.tick();

        assert_eq!(
            kernel.handle_system_call(SYSCALL_EXIT, 0, 0, 0),
            SyscallOutcome::Failed(KernelError::Process(ProcessError::NoCurrentProcess))
        );
        assert_eq!(
            kernel.processes().get(pid).unwrap().state(),
            ProcessState::Ready
        );
        assert_eq!(
            kernel.handle_system_call(SYSCALL_FORK, 0, 0, 0),
            SyscallOutcome::NotImplemented(Syscall::Fork)
        );
    }
}
