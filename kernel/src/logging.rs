//! Kernel logging facility
//!
//! Implements the `log` facade. Records are formatted as `[LEVEL] message`
//! and handed to a sink chosen at `init`, one record at a time.

use core::fmt::Arguments;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

/// Where formatted records go.
pub type Sink = fn(Arguments);

/// Global logger instance available throughout the kernel
pub static LOGGER: Logger = Logger::new();

pub struct Logger {
    sink: Mutex<Option<Sink>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub const fn new() -> Logger {
        Logger {
            sink: Mutex::new(None),
        }
    }

    pub fn set_sink(&self, sink: Sink) {
        *self.sink.lock() = Some(sink);
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    /// Holds the lock for the whole record so lines never interleave.
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let sink = self.sink.lock();
        if let Some(sink) = *sink {
            sink(format_args!("[{}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Installs `LOGGER` as the global logger writing to `sink`.
///
/// Fails if a logger is already installed; the level is applied either way.
pub fn init(level: LevelFilter, sink: Sink) -> Result<(), SetLoggerError> {
    LOGGER.set_sink(sink);
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::String, vec::Vec};

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn capture(args: Arguments) {
        CAPTURED.lock().push(alloc::format!("{}", args));
    }

    #[test]
    fn records_are_formatted_with_their_level() {
        let logger = Logger::new();
        log::set_max_level(LevelFilter::Trace);

        let warn = |logger: &Logger| {
            logger.log(
                &Record::builder()
                    .level(log::Level::Warn)
                    .args(format_args!("page pool exhausted"))
                    .build(),
            )
        };
        warn(&logger);
        assert!(CAPTURED.lock().is_empty());

        logger.set_sink(capture);
        warn(&logger);
        assert_eq!(
            CAPTURED.lock().as_slice(),
            ["[WARN] page pool exhausted\n"]
        );
    }
}
