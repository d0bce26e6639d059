//! Subprocess execution step
//!
//! Runs a command line through the platform shell, capturing stdout and
//! stderr, with an optional timeout after which the process is killed.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::command::{Command, CommandState, CommandStatus, Context, ExitStrategy};
use crate::error::{ParameterError, ParameterResult};

/// How often the deadline watch polls a child that has a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Configuration for a [`ProcessCommand`]
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Command line passed to the platform shell (required)
    pub command: String,
    /// Display name
    pub name: String,
    /// Directory the process runs in, created recursively if missing
    pub working_directory: PathBuf,
    /// Kill the process if it outlives this
    pub timeout: Option<Duration>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            command: String::new(),
            name: String::new(),
            working_directory: PathBuf::from("."),
            timeout: None,
        }
    }
}

/// A step that executes an external process.
///
/// Exit semantics: exit code 0 is success, any other code is an error, and
/// an exit the platform cannot report (e.g. the process died to a signal)
/// is a warning. A timed-out process is killed and reported as an error.
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    state: CommandState,
    command: String,
    working_directory: PathBuf,
    timeout: Option<Duration>,
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut { kill_error: Option<std::io::Error> },
    Unknown,
}

impl ProcessCommand {
    /// Build a command from its options.
    ///
    /// Fails if the command line is empty.
    pub fn new(options: ProcessOptions) -> ParameterResult<Self> {
        if options.command.trim().is_empty() {
            return Err(ParameterError::MissingCommandLine);
        }

        Ok(ProcessCommand {
            state: CommandState::new(options.name),
            command: options.command,
            working_directory: options.working_directory,
            timeout: options.timeout,
        })
    }

    /// The command line this step executes
    pub fn command_line(&self) -> &str {
        &self.command
    }

    /// The directory the process runs in
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The configured timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn spawn_child(&self) -> std::io::Result<Child> {
        let mut cmd = if cfg!(windows) {
            let mut c = StdCommand::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        } else {
            let mut c = StdCommand::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };

        cmd.current_dir(&self.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.spawn()
    }

    fn execute(&mut self) -> CommandStatus {
        if let Err(e) = fs::create_dir_all(&self.working_directory) {
            self.state.error_output = format!(
                "could not create working directory {}: {}",
                self.working_directory.display(),
                e
            );
            return CommandStatus::Error;
        }

        let mut child = match self.spawn_child() {
            Ok(child) => child,
            Err(e) => {
                debug!("failed to start '{}': {}", self.command, e);
                self.state.error_output = format!("failed to start '{}': {}", self.command, e);
                return CommandStatus::Error;
            }
        };

        // Drain both pipes off-thread so the child can never block on a
        // full pipe while we wait for it.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_all(stdout));
        let stderr_reader = thread::spawn(move || read_all(stderr));

        let outcome = match self.timeout {
            None => match child.wait() {
                Ok(status) => WaitOutcome::Exited(status),
                Err(_) => WaitOutcome::Unknown,
            },
            Some(timeout) => wait_with_deadline(&mut child, timeout),
        };

        self.state.output = stdout_reader.join().unwrap_or_default();
        self.state.error_output = stderr_reader.join().unwrap_or_default();

        match outcome {
            WaitOutcome::Exited(status) => match status.code() {
                Some(0) => CommandStatus::Success,
                Some(code) => {
                    debug!("'{}' exited with code {}", self.command, code);
                    CommandStatus::Error
                }
                None => {
                    warn!("'{}' exited without a reportable exit code", self.command);
                    CommandStatus::Warning
                }
            },
            WaitOutcome::TimedOut { kill_error } => {
                if let Some(e) = kill_error {
                    warn!("failed to kill timed out '{}': {}", self.command, e);
                    self.state
                        .error_output
                        .push_str(&format!("\nfailed to kill process: {}", e));
                }
                let timeout = self.timeout.unwrap_or_default();
                warn!("'{}' timed out after {:?}, killed", self.command, timeout);
                self.state
                    .error_output
                    .push_str(&format!("\ncommand timed out after {:?}", timeout));
                CommandStatus::Error
            }
            WaitOutcome::Unknown => {
                self.state
                    .error_output
                    .push_str("\ncould not determine process exit status");
                CommandStatus::Warning
            }
        }
    }
}

/// Wait for the child until it exits or the deadline passes, killing it in
/// the latter case. The kill is best-effort; a kill failure is reported
/// back but does not change the timed-out outcome.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> WaitOutcome {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return WaitOutcome::Exited(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let kill_error = child.kill().err();
                    // Reap the child so no zombie is left behind; the pipe
                    // readers see EOF once it is gone.
                    let _ = child.wait();
                    return WaitOutcome::TimedOut { kill_error };
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(_) => return WaitOutcome::Unknown,
        }
    }
}

fn read_all(stream: Option<impl Read>) -> String {
    let mut buffer = String::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_string(&mut buffer);
    }
    buffer
}

impl Command for ProcessCommand {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn status(&self) -> CommandStatus {
        self.state.status
    }

    fn set_status(&mut self, status: CommandStatus) {
        self.state.status = status;
    }

    fn output(&self) -> &str {
        &self.state.output
    }

    fn error_output(&self) -> &str {
        &self.state.error_output
    }

    fn backtrace(&self) -> &str {
        &self.state.backtrace
    }

    fn exec_time(&self) -> Duration {
        self.state.exec_time
    }

    fn number(&self) -> Option<usize> {
        self.state.number
    }

    fn set_number(&mut self, number: usize) {
        self.state.number = Some(number);
    }

    fn strategy(&self) -> Option<ExitStrategy> {
        self.state.strategy
    }

    fn set_strategy(&mut self, strategy: ExitStrategy) {
        self.state.strategy = Some(strategy);
    }

    fn run(&mut self, _context: Option<&Context>) -> CommandStatus {
        let start = Instant::now();
        self.state.status = CommandStatus::Running;

        self.state.status = self.execute();
        self.state.exec_time = start.elapsed();

        self.state.status
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn boxed_clone(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}
