#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
extern crate alloc;

use arrayvec::ArrayString;

pub mod constants;
pub mod devices;
pub mod error;
pub mod filesys;
pub mod init;
pub mod kernel;
pub mod logging;
pub mod memory;
pub mod processes;
pub mod shell;
pub mod syscalls;

pub use error::{ErrorKind, KernelError};
pub use kernel::Kernel;

/// Copies at most `CAP` bytes of `name`, cutting on a char boundary.
pub(crate) fn truncated<const CAP: usize>(name: &str) -> ArrayString<CAP> {
    let mut end = name.len().min(CAP);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    ArrayString::from(&name[..end]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncated::<8>("short").as_str(), "short");
        assert_eq!(truncated::<4>("abcdef").as_str(), "abcd");
        // 'é' is two bytes; cutting at 4 would split it
        assert_eq!(truncated::<4>("abcé").as_str(), "abc");
        assert_eq!(truncated::<4>("").as_str(), "");
    }
}
