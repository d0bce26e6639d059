//! Runnable step contract
//!
//! Everything a sequence can run implements the [`Command`] trait: external
//! processes ([`ProcessCommand`]), in-process closures ([`BlockCommand`]),
//! or custom types. A step never lets a failure escape its `run` method;
//! failures are reflected in its status and error output instead.

pub mod block;
pub mod process;

pub use block::*;
pub use process::*;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Execution state of a single runnable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The step has not been run since construction or the last reset
    NotExecuted,
    /// The step is currently executing
    Running,
    /// The step finished without complaint
    Success,
    /// The step finished but its outcome could not be fully confirmed
    Warning,
    /// The step failed
    Error,
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            CommandStatus::NotExecuted => "not_executed",
            CommandStatus::Running => "running",
            CommandStatus::Success => "success",
            CommandStatus::Warning => "warning",
            CommandStatus::Error => "error",
        };
        write!(f, "{}", token)
    }
}

/// Policy attached to a step controlling whether its failure halts the
/// sequence (`Fail*`) or merely poisons the final outcome while execution
/// continues (`Flunk*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitStrategy {
    /// Stop the sequence when the step errors (the default)
    #[default]
    FailOnError,
    /// Keep running, but the sequence outcome becomes error
    FlunkOnError,
    /// Stop the sequence when the step warns
    FailOnWarning,
    /// Keep running, but a warning escalates the outcome to error
    FlunkOnWarning,
}

impl ExitStrategy {
    /// Parse an external strategy token.
    ///
    /// Unrecognized tokens normalize to `FailOnError`.
    pub fn parse(token: &str) -> Self {
        match token {
            "fail_on_error" => ExitStrategy::FailOnError,
            "flunk_on_error" => ExitStrategy::FlunkOnError,
            "fail_on_warning" => ExitStrategy::FailOnWarning,
            "flunk_on_warning" => ExitStrategy::FlunkOnWarning,
            _ => ExitStrategy::FailOnError,
        }
    }

    /// The external token for this strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitStrategy::FailOnError => "fail_on_error",
            ExitStrategy::FlunkOnError => "flunk_on_error",
            ExitStrategy::FailOnWarning => "fail_on_warning",
            ExitStrategy::FlunkOnWarning => "flunk_on_warning",
        }
    }
}

impl fmt::Display for ExitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Variables handed to running steps.
///
/// The core treats the contents as opaque; a [`BlockCommand`] exposes the
/// context to its closure for the duration of the call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: HashMap<String, String>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Context::default()
    }

    /// Create a context with the given variables
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Context { vars }
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Get a variable value
    pub fn get_var(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// All variables in the context
    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

/// The contract every runnable step implements.
///
/// `run` must be defensive: any failure inside it is caught and reflected
/// as `CommandStatus::Error` with a readable message in `error_output`,
/// never propagated. Construction-time validation is the only place
/// errors reach the caller directly.
pub trait Command {
    /// Display name of the step
    fn name(&self) -> &str;

    /// Current execution status
    fn status(&self) -> CommandStatus;

    /// Overwrite the status (used by the sequence driver)
    fn set_status(&mut self, status: CommandStatus);

    /// Captured standard output of the last run
    fn output(&self) -> &str;

    /// Captured error output of the last run
    fn error_output(&self) -> &str;

    /// Failure backtrace of the last run, empty if none
    fn backtrace(&self) -> &str;

    /// Wall-clock duration of the last run
    fn exec_time(&self) -> Duration;

    /// Position within an owning sequence, if any
    fn number(&self) -> Option<usize>;

    /// Assign the sequence position (used by the sequence driver)
    fn set_number(&mut self, number: usize);

    /// Exit strategy within an owning sequence, if any
    fn strategy(&self) -> Option<ExitStrategy>;

    /// Assign the exit strategy (used by the sequence driver)
    fn set_strategy(&mut self, strategy: ExitStrategy);

    /// Execute the step and return the resulting status.
    ///
    /// The default implementation succeeds unconditionally, which is
    /// exactly what trivial stub commands need.
    fn run(&mut self, _context: Option<&Context>) -> CommandStatus {
        self.set_status(CommandStatus::Success);
        self.status()
    }

    /// Return all mutable state to the freshly constructed values
    fn reset(&mut self);

    /// Whether the last run succeeded
    fn success(&self) -> bool {
        self.status() == CommandStatus::Success
    }

    /// Whether the step has been run at all
    fn executed(&self) -> bool {
        self.status() != CommandStatus::NotExecuted
    }

    /// Clone into an independent boxed instance.
    ///
    /// Sequences own clones of the steps added to them; the caller's
    /// original is never mutated by sequence execution.
    fn boxed_clone(&self) -> Box<dyn Command>;
}

impl Clone for Box<dyn Command> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// The shared mutable field block of a step.
///
/// Concrete commands embed one of these and implement the [`Command`]
/// accessors by delegation.
#[derive(Debug, Clone)]
pub struct CommandState {
    pub name: String,
    pub status: CommandStatus,
    pub output: String,
    pub error_output: String,
    pub backtrace: String,
    pub exec_time: Duration,
    pub number: Option<usize>,
    pub strategy: Option<ExitStrategy>,
}

impl CommandState {
    /// Fresh state: not executed, empty output, zero duration
    pub fn new(name: impl Into<String>) -> Self {
        CommandState {
            name: name.into(),
            status: CommandStatus::NotExecuted,
            output: String::new(),
            error_output: String::new(),
            backtrace: String::new(),
            exec_time: Duration::ZERO,
            number: None,
            strategy: None,
        }
    }

    /// Restore the run-mutated fields to their zero values.
    ///
    /// Name, number and strategy survive a reset: number and strategy are
    /// owned by the sequence, which relies on them across resets.
    pub fn reset(&mut self) {
        self.status = CommandStatus::NotExecuted;
        self.output.clear();
        self.error_output.clear();
        self.backtrace.clear();
        self.exec_time = Duration::ZERO;
    }
}
