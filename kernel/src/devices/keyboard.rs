//! Keyboard input buffer.
//!
//! The interrupt side pushes decoded characters, the shell pulls them. The
//! queue is lock-free so a producer never waits on the consumer.

use crate::constants::devices::KEYBOARD_BUFFER_SIZE;
use crossbeam_queue::ArrayQueue;

/// Anything the shell can read characters from.
pub trait CharSource {
    fn next_char(&self) -> Option<char>;
}

pub struct KeyboardBuffer {
    queue: ArrayQueue<char>,
}

impl Default for KeyboardBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardBuffer {
    pub fn new() -> Self {
        Self {
            queue: ArrayQueue::new(KEYBOARD_BUFFER_SIZE),
        }
    }

    /// Queues a character. When the buffer is full the character is dropped
    /// and `false` is returned.
    pub fn push(&self, c: char) -> bool {
        match self.queue.push(c) {
            Ok(()) => true,
            Err(_) => {
                log::trace!("keyboard buffer full, dropped {:?}", c);
                false
            }
        }
    }

    /// Queues every character of `text`; returns how many were accepted.
    pub fn push_str(&self, text: &str) -> usize {
        text.chars().filter(|&c| self.push(c)).count()
    }

    pub fn get_char(&self) -> Option<char> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl CharSource for KeyboardBuffer {
    fn next_char(&self) -> Option<char> {
        self.get_char()
    }
}
