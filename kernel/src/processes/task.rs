//! Cooperative task bodies.
//!
//! A process body is an `async` block polled by the scheduler on the process's
//! round-robin turn. Its only yield points are syscalls and `yield_now`: a
//! syscall parks its request in the process's `SyscallGate`, the scheduler
//! services it right after the poll, and the next poll resumes the body with
//! the outcome.

use crate::{
    constants::{
        memory::PAGE_SIZE,
        syscalls::{SYSCALL_EXIT, SYSCALL_WRITE},
    },
    memory::{MemoryError, SharedMemory},
    processes::Pid,
    syscalls::SyscallOutcome,
};
use alloc::sync::Arc;
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use futures::{future::BoxFuture, task::noop_waker_ref};
use spin::Mutex;
use x86_64::{structures::paging::PhysFrame, PhysAddr};

/// A raw syscall as raised by a task: call number plus three word-sized arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    pub number: u32,
    pub args: [u64; 3],
}

/// Tags one raised syscall so its outcome reaches only the future that raised it.
pub(crate) type Ticket = u64;

enum GateState {
    Idle,
    Pending(Ticket, SyscallRequest),
    Complete(Ticket, SyscallOutcome),
}

struct GateInner {
    state: GateState,
    next_ticket: Ticket,
}

/// The channel between one task body and the kernel.
#[derive(Clone)]
pub struct SyscallGate {
    pid: Pid,
    stack: PhysFrame,
    memory: SharedMemory,
    inner: Arc<Mutex<GateInner>>,
}

impl SyscallGate {
    pub(crate) fn new(pid: Pid, stack: PhysFrame, memory: SharedMemory) -> Self {
        Self {
            pid,
            stack,
            memory,
            inner: Arc::new(Mutex::new(GateInner {
                state: GateState::Idle,
                next_ticket: 0,
            })),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Lowest address of the task's stack page.
    pub fn stack_base(&self) -> PhysAddr {
        self.stack.start_address()
    }

    /// Raises a syscall and resolves to its outcome once the kernel has serviced it.
    pub fn syscall(&self, number: u32, args: [u64; 3]) -> SyscallFuture {
        SyscallFuture {
            inner: self.inner.clone(),
            request: SyscallRequest { number, args },
            ticket: None,
        }
    }

    pub fn exit(&self) -> SyscallFuture {
        self.syscall(SYSCALL_EXIT, [0; 3])
    }

    /// Gives the rest of this turn back to the scheduler.
    pub fn yield_now(&self) -> YieldNow {
        YieldNow { yielded: false }
    }

    /// Copies `bytes` into the task's own stack page at `offset`.
    pub fn stage(&self, offset: usize, bytes: &[u8]) -> Result<PhysAddr, MemoryError> {
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= PAGE_SIZE as usize => {}
            _ => {
                let base = self.stack_base().as_u64();
                return Err(MemoryError::OutOfRange(base.saturating_add(offset as u64)));
            }
        }
        let address = self.stack_base() + offset as u64;
        self.memory.lock().write(address, bytes)?;
        Ok(address)
    }

    /// Writes `text` to the console through the `Write` syscall, staging it
    /// in the stack page one page-sized chunk at a time.
    pub async fn print(&self, text: &str) -> SyscallOutcome {
        let mut written = 0;
        for chunk in text.as_bytes().chunks(PAGE_SIZE as usize) {
            let address = match self.stage(0, chunk) {
                Ok(address) => address,
                Err(err) => return SyscallOutcome::Failed(err.into()),
            };
            match self
                .syscall(SYSCALL_WRITE, [address.as_u64(), chunk.len() as u64, 0])
                .await
            {
                SyscallOutcome::Completed(count) => written += count,
                other => return other,
            }
        }
        SyscallOutcome::Completed(written)
    }

    /// Takes the request parked by the last poll, if any.
    pub(crate) fn take_request(&self) -> Option<(Ticket, SyscallRequest)> {
        let mut inner = self.inner.lock();
        match core::mem::replace(&mut inner.state, GateState::Idle) {
            GateState::Pending(ticket, request) => Some((ticket, request)),
            other => {
                inner.state = other;
                None
            }
        }
    }

    pub(crate) fn complete(&self, ticket: Ticket, outcome: SyscallOutcome) {
        self.inner.lock().state = GateState::Complete(ticket, outcome);
    }
}

/// Future returned by [`SyscallGate::syscall`].
///
/// Dropping it after it has parked its request withdraws the request, or
/// discards the outcome if the kernel already serviced it.
pub struct SyscallFuture {
    inner: Arc<Mutex<GateInner>>,
    request: SyscallRequest,
    ticket: Option<Ticket>,
}

impl Future for SyscallFuture {
    type Output = SyscallOutcome;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<SyscallOutcome> {
        let this = self.get_mut();
        let mut inner = this.inner.lock();

        match (this.ticket, core::mem::replace(&mut inner.state, GateState::Idle)) {
            (Some(mine), GateState::Complete(ticket, outcome)) if ticket == mine => {
                this.ticket = None;
                Poll::Ready(outcome)
            }
            // a request is parked and not yet serviced
            (_, pending @ GateState::Pending(..)) => {
                inner.state = pending;
                Poll::Pending
            }
            (None, _) => {
                let ticket = inner.next_ticket;
                inner.next_ticket = inner.next_ticket.wrapping_add(1);
                inner.state = GateState::Pending(ticket, this.request);
                this.ticket = Some(ticket);
                Poll::Pending
            }
            (Some(_), other) => {
                inner.state = other;
                Poll::Pending
            }
        }
    }
}

impl Drop for SyscallFuture {
    fn drop(&mut self) {
        let Some(mine) = self.ticket else {
            return;
        };
        let mut inner = self.inner.lock();
        let owned = match &inner.state {
            GateState::Pending(ticket, _) | GateState::Complete(ticket, _) => *ticket == mine,
            GateState::Idle => false,
        };
        if owned {
            inner.state = GateState::Idle;
        }
    }
}

/// Future returned by [`SyscallGate::yield_now`].
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

/// A process body together with its gate.
pub(crate) struct Task {
    future: BoxFuture<'static, ()>,
    pub(crate) gate: SyscallGate,
}

impl Task {
    pub(crate) fn new(future: BoxFuture<'static, ()>, gate: SyscallGate) -> Self {
        Self { future, gate }
    }

    /// Runs the body up to its next yield point.
    pub(crate) fn poll(&mut self) -> Poll<()> {
        let mut context = Context::from_waker(noop_waker_ref());
        self.future.as_mut().poll(&mut context)
    }
}
