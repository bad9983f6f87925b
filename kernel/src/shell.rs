//! Line-oriented command shell.
//!
//! Characters come from a `CharSource` (the kernel's keyboard buffer by
//! default) and are echoed to the console. A completed line is split into at
//! most `MAX_ARGS` words and run as a built-in command against the kernel.

use crate::{
    constants::{
        devices::{MAX_ARGS, MAX_COMMAND_LENGTH},
        processes::SHELL_ENTRY,
    },
    devices::CharSource,
    filesys::{get_path_string, resolve_path, DirId, FilePermissions, FileType, FsError},
    kernel::Kernel,
    processes::Pid,
    KernelError,
};
use alloc::{format, string::String};
use arrayvec::{ArrayString, ArrayVec};

const HELP: &str = "Available commands:
  help          - Show this help message
  clear         - Clear the screen
  echo [args]   - Print arguments
  ls [path]     - List a directory
  cd [path]     - Change directory
  pwd           - Print working directory
  mkdir <name>  - Create a directory
  rmdir <name>  - Remove an empty directory
  touch <name>  - Create an empty file
  write <name> [text] - Append text to a file
  cat <name>    - Print a file
  rm <name>     - Remove a file
  ps            - List processes
  exit          - Exit the shell

";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStatus {
    Continue,
    Exit,
}

#[derive(Default)]
pub struct Shell {
    line: ArrayString<MAX_COMMAND_LENGTH>,
    pid: Option<Pid>,
    /// The last character was a carriage return.
    after_cr: bool,
}

impl Shell {
    /// A shell without a process of its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the shell process, greets and prints the first prompt.
    pub fn start(kernel: &mut Kernel) -> Result<Self, KernelError> {
        let pid = kernel.create_process("shell", SHELL_ENTRY)?;
        let shell = Self {
            line: ArrayString::new(),
            pid: Some(pid),
            after_cr: false,
        };
        kernel.console().write_str("minos shell\n");
        kernel
            .console()
            .write_str("Type 'help' for available commands\n\n");
        shell.prompt(kernel);
        Ok(shell)
    }

    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    /// Consumes pending keyboard input.
    pub fn poll(&mut self, kernel: &mut Kernel) -> ShellStatus {
        let keyboard = kernel.keyboard().clone();
        self.poll_from(kernel, keyboard.as_ref())
    }

    /// Consumes every character `source` has ready, running each completed
    /// line. Stops early when a command exits the shell.
    pub fn poll_from(&mut self, kernel: &mut Kernel, source: &dyn CharSource) -> ShellStatus {
        while let Some(c) = source.next_char() {
            // "\r\n" ends one line, not two
            let crlf = c == '\n' && self.after_cr;
            self.after_cr = c == '\r';
            if crlf {
                continue;
            }
            match c {
                '\n' | '\r' => {
                    kernel.console().write_str("\n");
                    let line = core::mem::take(&mut self.line);
                    if self.execute(kernel, &line) == ShellStatus::Exit {
                        return ShellStatus::Exit;
                    }
                    self.prompt(kernel);
                }
                // backspace and delete
                '\x08' | '\x7f' => {
                    if self.line.pop().is_some() {
                        kernel.console().write_str("\x08 \x08");
                    }
                }
                c => {
                    if self.line.try_push(c).is_ok() {
                        let mut echo = [0u8; 4];
                        kernel.console().write_str(c.encode_utf8(&mut echo));
                    }
                }
            }
        }
        ShellStatus::Continue
    }

    pub fn prompt(&self, kernel: &mut Kernel) {
        let cwd = kernel.filesystem().current_directory();
        let path = get_path_string(kernel.filesystem(), cwd).unwrap_or_else(|_| String::from("?"));
        kernel.console().write_str(&format!("minos:{}> ", path));
    }

    /// Runs one command line. Failures are printed, never propagated.
    pub fn execute(&mut self, kernel: &mut Kernel, line: &str) -> ShellStatus {
        let words: ArrayVec<&str, MAX_ARGS> = line.split_whitespace().take(MAX_ARGS).collect();
        let Some((&command, args)) = words.split_first() else {
            return ShellStatus::Continue;
        };
        log::debug!("shell: {:?}", words);

        let result = match command {
            "help" => {
                kernel.console().write_str(HELP);
                Ok(())
            }
            "clear" => {
                kernel.console().clear();
                Ok(())
            }
            "echo" => {
                let mut text = args.join(" ");
                text.push('\n');
                kernel.console().write_str(&text);
                Ok(())
            }
            "ls" => list(kernel, args.first().copied()),
            "cd" => change_directory(kernel, args.first().copied()),
            "pwd" => {
                let cwd = kernel.filesystem().current_directory();
                get_path_string(kernel.filesystem(), cwd)
                    .map(|path| kernel.console().write_str(&format!("{}\n", path)))
                    .map_err(KernelError::from)
            }
            "mkdir" => with_name(args, |name| make_directory(kernel, name)),
            "rmdir" => with_name(args, |name| remove_directory(kernel, name)),
            "touch" => with_name(args, |name| touch(kernel, name)),
            "write" => with_name(args, |name| append(kernel, name, &args[1..])),
            "cat" => with_name(args, |name| cat(kernel, name)),
            "rm" => with_name(args, |name| remove_file(kernel, name)),
            "ps" => {
                list_processes(kernel);
                Ok(())
            }
            "exit" => {
                if let Some(pid) = self.pid.take() {
                    if let Err(err) = kernel.terminate(pid) {
                        log::warn!("shell process {} already gone: {}", pid, err);
                    }
                }
                kernel.console().write_str("Goodbye\n");
                return ShellStatus::Exit;
            }
            unknown => {
                kernel
                    .console()
                    .write_str(&format!("Command not found: {}\n", unknown));
                Ok(())
            }
        };

        if let Err(err) = result {
            kernel
                .console()
                .write_str(&format!("{}: {}\n", command, err));
        }
        ShellStatus::Continue
    }
}

fn with_name(
    args: &[&str],
    run: impl FnOnce(&str) -> Result<(), KernelError>,
) -> Result<(), KernelError> {
    match args.first() {
        Some(name) => run(name),
        None => Err(FsError::InvalidName.into()),
    }
}

fn list(kernel: &mut Kernel, path: Option<&str>) -> Result<(), KernelError> {
    let fs = kernel.filesystem();
    let dir = resolve_path(fs, fs.current_directory(), path.unwrap_or("."))?;
    let mut out = format!("Directory listing for: {}\n", get_path_string(fs, dir)?);
    for entry in fs.list_directory(dir)? {
        if entry.is_dir() {
            out.push_str(&format!("  {}/\n", entry.name));
        } else {
            out.push_str(&format!("  {:<31} {:>5}\n", entry.name, entry.size));
        }
    }
    kernel.console().write_str(&out);
    Ok(())
}

fn change_directory(kernel: &mut Kernel, path: Option<&str>) -> Result<(), KernelError> {
    let fs = kernel.filesystem_mut();
    let dir = match path {
        Some(path) => resolve_path(fs, fs.current_directory(), path)?,
        None => DirId::ROOT,
    };
    fs.set_current_directory(dir)?;
    Ok(())
}

fn make_directory(kernel: &mut Kernel, name: &str) -> Result<(), KernelError> {
    let fs = kernel.filesystem_mut();
    if fs.find_directory(name, fs.current_directory()).is_ok() {
        kernel
            .console()
            .write_str(&format!("mkdir: {} already exists\n", name));
        return Ok(());
    }
    fs.create_directory(name)?;
    Ok(())
}

fn remove_directory(kernel: &mut Kernel, name: &str) -> Result<(), KernelError> {
    let fs = kernel.filesystem_mut();
    let dir = fs.find_directory(name, fs.current_directory())?;
    fs.delete_directory(dir)?;
    Ok(())
}

fn touch(kernel: &mut Kernel, name: &str) -> Result<(), KernelError> {
    let fs = kernel.filesystem_mut();
    if fs.find_file(name, fs.current_directory()).is_err() {
        fs.create_file(name, FileType::Regular, FilePermissions::READ_WRITE)?;
    }
    Ok(())
}

fn append(kernel: &mut Kernel, name: &str, words: &[&str]) -> Result<(), KernelError> {
    let fs = kernel.filesystem_mut();
    let cwd = fs.current_directory();
    let file = match fs.find_file(name, cwd) {
        Ok(file) => file,
        Err(FsError::NotFound) => {
            fs.create_file(name, FileType::Regular, FilePermissions::READ_WRITE)?
        }
        Err(err) => return Err(err.into()),
    };

    let mut text = words.join(" ");
    text.push('\n');
    let end = fs.file(file)?.size;
    fs.write_file(file, text.as_bytes(), end)?;
    Ok(())
}

fn cat(kernel: &mut Kernel, name: &str) -> Result<(), KernelError> {
    let fs = kernel.filesystem();
    let file = fs.find_file(name, fs.current_directory())?;
    let text = String::from_utf8_lossy(fs.contents(file)?).into_owned();
    kernel.console().write_str(&text);
    if !text.is_empty() && !text.ends_with('\n') {
        kernel.console().write_str("\n");
    }
    Ok(())
}

fn remove_file(kernel: &mut Kernel, name: &str) -> Result<(), KernelError> {
    let fs = kernel.filesystem_mut();
    let file = fs.find_file(name, fs.current_directory())?;
    fs.delete_file(file)?;
    Ok(())
}

fn list_processes(kernel: &mut Kernel) {
    let mut out = String::from("  PID  STATE       NAME\n");
    for process in kernel.processes().iter() {
        out.push_str(&format!(
            "{:>5}  {:<10}  {}\n",
            process.pid,
            process.state(),
            process.name()
        ));
    }
    kernel.console().write_str(&out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::{KeyboardBuffer, MemoryConsole},
        init::{init, KernelConfig},
        processes::ProcessState,
    };
    use alloc::boxed::Box;

    fn setup() -> (Kernel, Shell, MemoryConsole) {
        let console = MemoryConsole::new();
        let kernel = init(KernelConfig::default(), Box::new(console.clone())).unwrap();
        console.clear_transcript();
        (kernel, Shell::new(), console)
    }

    /// Runs `line` and returns what it printed.
    fn run(kernel: &mut Kernel, shell: &mut Shell, console: &MemoryConsole, line: &str) -> String {
        console.clear_transcript();
        assert_eq!(shell.execute(kernel, line), ShellStatus::Continue);
        console.transcript()
    }

    #[test]
    fn echo_joins_words() {
        let (mut kernel, mut shell, console) = setup();
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "echo  hello   world "),
            "hello world\n"
        );
        assert_eq!(run(&mut kernel, &mut shell, &console, "echo"), "\n");
    }

    #[test]
    fn unknown_and_empty_commands() {
        let (mut kernel, mut shell, console) = setup();
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "frobnicate now"),
            "Command not found: frobnicate\n"
        );
        assert_eq!(run(&mut kernel, &mut shell, &console, "   "), "");
    }

    #[test]
    fn help_lists_commands() {
        let (mut kernel, mut shell, console) = setup();
        let out = run(&mut kernel, &mut shell, &console, "help");
        for command in ["help", "clear", "echo", "ls", "cd", "pwd", "exit"] {
            assert!(out.contains(&format!("  {} ", command)), "missing {}", command);
        }
    }

    #[test]
    fn clear_wipes_the_console() {
        let (mut kernel, mut shell, console) = setup();
        kernel.console().write_str("old output");
        shell.execute(&mut kernel, "clear");
        assert_eq!(console.transcript(), "");
    }

    #[test]
    fn ls_shows_boot_files() {
        let (mut kernel, mut shell, console) = setup();
        run(&mut kernel, &mut shell, &console, "mkdir etc");
        let out = run(&mut kernel, &mut shell, &console, "ls");
        let lines: alloc::vec::Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Directory listing for: /");
        assert!(lines[1].starts_with("  kernel.bin "));
        assert!(lines[2].starts_with("  shell.bin "));
        assert!(lines[3].starts_with("  init.bin "));
        assert_eq!(lines[4], "  etc/");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn directories_and_paths() {
        let (mut kernel, mut shell, console) = setup();
        run(&mut kernel, &mut shell, &console, "mkdir etc");
        run(&mut kernel, &mut shell, &console, "cd etc");
        run(&mut kernel, &mut shell, &console, "mkdir init.d");
        run(&mut kernel, &mut shell, &console, "cd init.d");
        assert_eq!(run(&mut kernel, &mut shell, &console, "pwd"), "/etc/init.d\n");

        run(&mut kernel, &mut shell, &console, "cd ..");
        assert_eq!(run(&mut kernel, &mut shell, &console, "pwd"), "/etc\n");
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "ls /"),
            run(&mut kernel, &mut shell, &console, "ls ..")
        );

        run(&mut kernel, &mut shell, &console, "cd");
        assert_eq!(run(&mut kernel, &mut shell, &console, "pwd"), "/\n");
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "cd nowhere"),
            "cd: No such file or directory\n"
        );
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "mkdir etc"),
            "mkdir: etc already exists\n"
        );
    }

    #[test]
    fn files_round_trip_through_commands() {
        let (mut kernel, mut shell, console) = setup();
        run(&mut kernel, &mut shell, &console, "touch notes");
        assert_eq!(run(&mut kernel, &mut shell, &console, "cat notes"), "");

        run(&mut kernel, &mut shell, &console, "write notes first line");
        run(&mut kernel, &mut shell, &console, "write notes second");
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "cat notes"),
            "first line\nsecond\n"
        );

        run(&mut kernel, &mut shell, &console, "rm notes");
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "cat notes"),
            "cat: No such file or directory\n"
        );
        assert_eq!(
            run(&mut kernel, &mut shell, &console, "rm"),
            "rm: Invalid name\n"
        );
    }

    #[test]
    fn rmdir_refuses_non_empty_directories() {
        let (mut kernel, mut shell, console) = setup();
        run(&mut kernel, &mut shell, &console, "mkdir docs");
        run(&mut kernel, &mut shell, &console, "cd docs");
        run(&mut kernel, &mut shell, &console, "touch readme");
        run(&mut kernel, &mut shell, &console, "cd ..");

        assert_eq!(
            run(&mut kernel, &mut shell, &console, "rmdir docs"),
            "rmdir: Directory not empty\n"
        );
        run(&mut kernel, &mut shell, &console, "cd docs");
        run(&mut kernel, &mut shell, &console, "rm readme");
        run(&mut kernel, &mut shell, &console, "cd /");
        assert_eq!(run(&mut kernel, &mut shell, &console, "rmdir docs"), "");
        assert!(!run(&mut kernel, &mut shell, &console, "ls").contains("docs"));
    }

    #[test]
    fn ps_and_exit() {
        let console = MemoryConsole::new();
        let mut kernel = init(KernelConfig::default(), Box::new(console.clone())).unwrap();
        let mut shell = Shell::start(&mut kernel).unwrap();
        let pid = shell.pid().unwrap();
        assert!(console.transcript().ends_with("minos:/> "));

        let out = run(&mut kernel, &mut shell, &console, "ps");
        assert!(out.contains(&format!("{:>5}  ready       shell\n", pid)));

        assert_eq!(shell.execute(&mut kernel, "exit"), ShellStatus::Exit);
        assert_eq!(
            kernel.processes().get(pid).unwrap().state(),
            ProcessState::Terminated
        );
        kernel.tick();
        assert!(kernel.processes().is_empty());
    }

    #[test]
    fn keyboard_input_drives_the_shell() {
        let (mut kernel, mut shell, console) = setup();
        kernel.keyboard().push_str("ecko\x08\x08ho hi\nmkdir tmp\ncd tmp\npw");

        assert_eq!(shell.poll(&mut kernel), ShellStatus::Continue);
        let out = console.transcript();
        assert!(out.starts_with("ecko\x08 \x08\x08 \x08ho hi\nhi\nminos:/> "));
        assert!(out.ends_with("minos:/tmp> pw"));

        kernel.keyboard().push_str("d\nexit\necho never\n");
        console.clear_transcript();
        assert_eq!(shell.poll(&mut kernel), ShellStatus::Exit);
        assert_eq!(console.transcript(), "d\n/tmp\nminos:/tmp> exit\nGoodbye\n");
        assert_eq!(kernel.keyboard().len(), "echo never\n".len());
    }

    #[test]
    fn crlf_ends_a_single_line() {
        let (mut kernel, mut shell, console) = setup();
        let keyboard = KeyboardBuffer::new();
        keyboard.push_str("echo a\r\necho b\recho c\n");

        assert_eq!(shell.poll_from(&mut kernel, &keyboard), ShellStatus::Continue);
        assert_eq!(
            console.transcript(),
            "echo a\na\nminos:/> echo b\nb\nminos:/> echo c\nc\nminos:/> "
        );
    }

    #[test]
    fn long_lines_are_cut_at_the_buffer_limit() {
        let (mut kernel, mut shell, _) = setup();
        let keyboard = KeyboardBuffer::new();
        keyboard.push_str("echo ");
        for _ in 0..(MAX_COMMAND_LENGTH) {
            keyboard.push('x');
        }
        shell.poll_from(&mut kernel, &keyboard);
        assert_eq!(shell.line.len(), MAX_COMMAND_LENGTH);
    }
}
