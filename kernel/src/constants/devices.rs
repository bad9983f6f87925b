//! Console and keyboard limits.

/// Characters held by the keyboard buffer before new input is dropped.
pub const KEYBOARD_BUFFER_SIZE: usize = 256;

/// Longest shell command line in bytes.
pub const MAX_COMMAND_LENGTH: usize = 255;
pub const MAX_ARGS: usize = 10;
