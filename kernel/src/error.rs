//! Kernel-wide error type.
//!
//! Each subsystem reports its own error enum; `KernelError` wraps them so the
//! kernel context and the syscall layer can use `?` across subsystems, and
//! `kind()` folds every failure into the closed set callers branch on.

use crate::{filesys::FsError, init::ConfigError, memory::MemoryError, processes::ProcessError};

/// The failure kinds callers are expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CapacityExceeded,
    NotFound,
    NotEmpty,
    InvalidId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    Memory(MemoryError),
    Process(ProcessError),
    Fs(FsError),
    Config(ConfigError),
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::Memory(err) => err.kind(),
            KernelError::Process(err) => err.kind(),
            KernelError::Fs(err) => err.kind(),
            KernelError::Config(_) => ErrorKind::InvalidId,
        }
    }
}

impl MemoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::Exhausted => ErrorKind::CapacityExceeded,
            MemoryError::DoubleFree(_) => ErrorKind::NotFound,
            MemoryError::OutOfRange(_) | MemoryError::Misaligned(_) | MemoryError::Reserved(_) => {
                ErrorKind::InvalidId
            }
        }
    }
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::TableFull => ErrorKind::CapacityExceeded,
            ProcessError::StackAllocation(err) => err.kind(),
            ProcessError::NoSuchProcess(_) | ProcessError::NoCurrentProcess => ErrorKind::NotFound,
        }
    }
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::CapacityExceeded => ErrorKind::CapacityExceeded,
            FsError::NotFound => ErrorKind::NotFound,
            FsError::NotEmpty => ErrorKind::NotEmpty,
            FsError::InvalidId | FsError::InvalidName => ErrorKind::InvalidId,
        }
    }
}

impl From<MemoryError> for KernelError {
    fn from(err: MemoryError) -> Self {
        KernelError::Memory(err)
    }
}

impl From<ProcessError> for KernelError {
    fn from(err: ProcessError) -> Self {
        KernelError::Process(err)
    }
}

impl From<FsError> for KernelError {
    fn from(err: FsError) -> Self {
        KernelError::Fs(err)
    }
}

impl From<ConfigError> for KernelError {
    fn from(err: ConfigError) -> Self {
        KernelError::Config(err)
    }
}

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KernelError::Memory(err) => write!(f, "{}", err),
            KernelError::Process(err) => write!(f, "{}", err),
            KernelError::Fs(err) => write!(f, "{}", err),
            KernelError::Config(err) => write!(f, "{}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_every_subsystem() {
        assert_eq!(
            KernelError::from(MemoryError::Exhausted).kind(),
            ErrorKind::CapacityExceeded
        );
        assert_eq!(
            KernelError::from(ProcessError::StackAllocation(MemoryError::Exhausted)).kind(),
            ErrorKind::CapacityExceeded
        );
        assert_eq!(KernelError::from(FsError::NotEmpty).kind(), ErrorKind::NotEmpty);
        assert_eq!(
            KernelError::from(MemoryError::DoubleFree(0x10_0000)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            KernelError::from(ConfigError::EmptyPool).kind(),
            ErrorKind::InvalidId
        );
    }
}
