//! Text output.

use alloc::{string::String, sync::Arc};
use arrayvec::ArrayString;
use core::fmt::Write;
use spin::Mutex;

/// A text sink the kernel and the shell print to.
pub trait Console: Send {
    fn write_str(&mut self, text: &str);

    /// Prints `value` as `0x` followed by eight upper-case hex digits.
    fn write_hex(&mut self, value: u32) {
        let mut buffer = ArrayString::<10>::new();
        if write!(buffer, "0x{:08X}", value).is_ok() {
            self.write_str(&buffer);
        }
    }

    fn clear(&mut self);
}

/// Console that records everything written to it. Clones share one transcript.
#[derive(Clone, Default)]
pub struct MemoryConsole {
    transcript: Arc<Mutex<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> String {
        self.transcript.lock().clone()
    }

    pub fn clear_transcript(&self) {
        self.transcript.lock().clear();
    }
}

impl Console for MemoryConsole {
    fn write_str(&mut self, text: &str) {
        self.transcript.lock().push_str(text);
    }

    fn clear(&mut self) {
        self.clear_transcript();
    }
}
