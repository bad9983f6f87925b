//! Character devices: console output and the keyboard buffer.

pub mod console;
pub mod keyboard;

pub use console::{Console, MemoryConsole};
pub use keyboard::{CharSource, KeyboardBuffer};
