use crate::{
    kernel::Kernel,
    memory::MemoryError,
    processes::ProcessError,
    syscalls::{Syscall, SyscallOutcome},
    KernelError,
};
use alloc::string::String;
use x86_64::PhysAddr;

/// Routes a raw syscall to its handler. Never panics: malformed arguments
/// and unknown numbers are reported through the outcome.
pub fn dispatch_syscall(kernel: &mut Kernel, number: u32, args: [u64; 3]) -> SyscallOutcome {
    let call = match Syscall::try_from(number) {
        Ok(call) => call,
        Err(number) => return sys_unknown(kernel, number),
    };
    log::trace!("syscall {:?} args {:X?}", call, args);

    let result = match call {
        Syscall::Write => sys_write(kernel, args[0], args[1]),
        Syscall::Exit => sys_exit(kernel),
        Syscall::Read | Syscall::Fork | Syscall::Exec => {
            log::debug!("syscall {:?} is not implemented", call);
            return SyscallOutcome::NotImplemented(call);
        }
    };

    match result {
        Ok(value) => SyscallOutcome::Completed(value),
        Err(err) => {
            log::warn!("syscall {:?} failed: {}", call, err);
            SyscallOutcome::Failed(err)
        }
    }
}

impl Kernel {
    pub fn handle_system_call(
        &mut self,
        number: u32,
        arg1: u64,
        arg2: u64,
        arg3: u64,
    ) -> SyscallOutcome {
        dispatch_syscall(self, number, [arg1, arg2, arg3])
    }
}

fn sys_write(kernel: &mut Kernel, address: u64, length: u64) -> Result<u64, KernelError> {
    let out_of_range = MemoryError::OutOfRange(address);
    let start = PhysAddr::try_new(address).map_err(|_| out_of_range)?;
    let length = usize::try_from(length).map_err(|_| out_of_range)?;

    if !kernel.allocator.is_range_allocated(start, length) {
        return Err(out_of_range.into());
    }

    let text = {
        let memory = kernel.memory.lock();
        String::from_utf8_lossy(memory.read(start, length)?).into_owned()
    };
    kernel.console.write_str(&text);

    Ok(length as u64)
}

fn sys_exit(kernel: &mut Kernel) -> Result<u64, KernelError> {
    let pid = kernel.current_pid().ok_or(ProcessError::NoCurrentProcess)?;
    kernel.processes.terminate(pid)?;
    log::info!("process {} exited", pid);
    Ok(0)
}

fn sys_unknown(kernel: &mut Kernel, number: u32) -> SyscallOutcome {
    log::warn!("unknown system call {:#X}", number);
    let console = kernel.console.as_mut();
    console.write_str("Unknown system call: ");
    console.write_hex(number);
    console.write_str("\n");
    SyscallOutcome::Unknown(number)
}
