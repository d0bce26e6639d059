//! In-process step execution
//!
//! A [`BlockCommand`] runs a closure instead of an external process. The
//! closure receives the command itself, so it can write output and error
//! output through the regular accessors, and can read the run context for
//! the duration of the call.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use crate::command::{Command, CommandState, CommandStatus, Context, ExitStrategy};
use crate::error::{ParameterError, ParameterResult};

/// Callable run by a [`BlockCommand`]. A returned `Err` marks the step as
/// failed; the error message lands in the step's error output.
pub type BlockFn = dyn Fn(&mut BlockCommand) -> anyhow::Result<()>;

/// A step that runs an in-process closure in a given working directory.
///
/// The directory change is process-global for the duration of the call and
/// restored afterwards. Because of that, block commands are not safe to
/// run concurrently from multiple threads of one process.
#[derive(Clone)]
pub struct BlockCommand {
    state: CommandState,
    working_directory: PathBuf,
    block: Arc<BlockFn>,
    context: Option<Context>,
}

impl BlockCommand {
    /// Build a block command from a name and a callable.
    ///
    /// Fails if the name is empty. The callable itself is required by the
    /// signature.
    pub fn new(
        name: &str,
        block: impl Fn(&mut BlockCommand) -> anyhow::Result<()> + 'static,
    ) -> ParameterResult<Self> {
        if name.trim().is_empty() {
            return Err(ParameterError::MissingName);
        }

        Ok(BlockCommand {
            state: CommandState::new(name),
            working_directory: PathBuf::from("."),
            block: Arc::new(block),
            context: None,
        })
    }

    /// Set the directory the block runs in (defaults to `.`)
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// The directory the block runs in
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Context handed to `run`, visible only while the block executes
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Replace the captured output
    pub fn set_output(&mut self, output: impl Into<String>) {
        self.state.output = output.into();
    }

    /// Append to the captured output
    pub fn append_output(&mut self, chunk: &str) {
        self.state.output.push_str(chunk);
    }

    /// Replace the captured error output
    pub fn set_error_output(&mut self, error_output: impl Into<String>) {
        self.state.error_output = error_output.into();
    }

    /// Append to the captured error output
    pub fn append_error_output(&mut self, chunk: &str) {
        self.state.error_output.push_str(chunk);
    }
}

impl fmt::Debug for BlockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCommand")
            .field("name", &self.state.name)
            .field("status", &self.state.status)
            .field("working_directory", &self.working_directory)
            .finish_non_exhaustive()
    }
}

/// Restores the process working directory when dropped, so the change
/// cannot leak past the block call on any exit path.
struct WorkingDirGuard {
    original: PathBuf,
}

impl WorkingDirGuard {
    fn change_to(dir: &Path) -> std::io::Result<Self> {
        let original = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(WorkingDirGuard { original })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.original);
    }
}

impl Command for BlockCommand {
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

    fn run(&mut self, context: Option<&Context>) -> CommandStatus {
        let start = Instant::now();

        self.state.output.clear();
        self.state.error_output.clear();
        self.state.backtrace.clear();
        self.state.status = CommandStatus::Running;
        self.context = context.cloned();

        let status = match WorkingDirGuard::change_to(&self.working_directory) {
            Ok(_guard) => {
                let block = Arc::clone(&self.block);
                match (block.as_ref())(self) {
                    Ok(()) => CommandStatus::Success,
                    Err(err) => {
                        debug!("block '{}' failed: {:#}", self.state.name, err);
                        self.state.error_output.push_str(&format!("\n{}", err));
                        self.state.backtrace = format!("{:?}", err);
                        CommandStatus::Error
                    }
                }
            }
            Err(e) => {
                self.state.error_output.push_str(&format!(
                    "\ncould not change to directory {}: {}",
                    self.working_directory.display(),
                    e
                ));
                self.state.backtrace = e.to_string();
                CommandStatus::Error
            }
        };

        // The context is the one field reset after execution instead of
        // before: it is only valid while the block runs.
        self.context = None;
        self.state.status = status;
        self.state.exec_time = start.elapsed();

        self.state.status
    }

    fn reset(&mut self) {
        self.state.reset();
        self.context = None;
    }

    fn boxed_clone(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}
