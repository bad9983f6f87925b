//! System-wide constants and fixed table capacities.

pub mod devices;
pub mod filesys;
pub mod memory;
pub mod processes;
pub mod syscalls;
