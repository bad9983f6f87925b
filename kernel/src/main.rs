//! Runs the kernel on the host: the console is stdout, the keyboard is stdin
//! and log records go to stderr.

use minos::{
    devices::Console,
    init::{init, KernelConfig},
    logging,
    shell::{Shell, ShellStatus},
    KernelError,
};
use std::io::{self, BufRead, Write};

struct StdoutConsole;

impl Console for StdoutConsole {
    fn write_str(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            log::error!("console write failed: {}", err);
        }
    }

    fn clear(&mut self) {
        self.write_str("\x1b[2J\x1b[H");
    }
}

fn log_to_stderr(args: core::fmt::Arguments) {
    eprint!("{}", args);
}

/// Scheduler turns given to background processes per line of input.
const TICKS_PER_LINE: usize = 32;

fn main() -> Result<(), KernelError> {
    let config = KernelConfig::default();
    if logging::init(config.log_level, log_to_stderr).is_err() {
        eprintln!("logger already installed");
    }

    let mut kernel = init(config, Box::new(StdoutConsole))?;
    kernel.spawn("init", 0x1000, |gate| async move {
        gate.print("init: hello from pid ").await;
        gate.print(&format!("{}\n", gate.pid())).await;
        gate.exit().await;
    })?;
    kernel.run(TICKS_PER_LINE);

    let mut shell = Shell::start(&mut kernel)?;
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        kernel.keyboard().push_str(&line);
        kernel.keyboard().push('\n');

        if shell.poll(&mut kernel) == ShellStatus::Exit {
            break;
        }
        for _ in 0..TICKS_PER_LINE {
            kernel.tick();
        }
    }
    kernel.reap_terminated();
    Ok(())
}
