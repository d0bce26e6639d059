//! Aggregated sequence state
//!
//! [`SequenceStatus`] collects per-step snapshots and folds them into one
//! overall status under a monotonic-worsening rule: once the aggregate
//! reaches error it never improves, and a warning never downgrades to
//! success.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use log::debug;

use crate::command::{Command, CommandStatus, ExitStrategy};

/// Snapshot of one step at submission time
#[derive(Debug, Clone)]
pub struct StepState {
    pub number: usize,
    pub name: String,
    pub status: CommandStatus,
    pub output: String,
    pub duration: Duration,
    pub error: String,
    pub strategy: Option<ExitStrategy>,
}

/// Aggregate status of a command sequence.
///
/// Step snapshots are keyed by step number; re-submitting a step
/// overwrites its snapshot. The map is ordered, so reports come out in
/// ascending step order.
#[derive(Debug, Clone)]
pub struct SequenceStatus {
    sequence_name: String,
    sequence_runner: String,
    sequence_id: Option<String>,
    status: CommandStatus,
    start_time: SystemTime,
    stop_time: Option<SystemTime>,
    step_states: BTreeMap<usize, StepState>,
}

impl SequenceStatus {
    /// Fresh status for a sequence: not executed, no steps recorded
    pub fn new(sequence_name: impl Into<String>) -> Self {
        SequenceStatus {
            sequence_name: sequence_name.into(),
            sequence_runner: String::new(),
            sequence_id: None,
            status: CommandStatus::NotExecuted,
            start_time: SystemTime::now(),
            stop_time: None,
            step_states: BTreeMap::new(),
        }
    }

    /// Name of the sequence this status belongs to
    pub fn sequence_name(&self) -> &str {
        &self.sequence_name
    }

    /// Informational name of whatever is running the sequence
    pub fn sequence_runner(&self) -> &str {
        &self.sequence_runner
    }

    pub fn set_sequence_runner(&mut self, runner: impl Into<String>) {
        self.sequence_runner = runner.into();
    }

    /// Optional external identifier of this sequence run
    pub fn sequence_id(&self) -> Option<&str> {
        self.sequence_id.as_deref()
    }

    pub fn set_sequence_id(&mut self, id: impl Into<String>) {
        self.sequence_id = Some(id.into());
    }

    /// Current aggregate status
    pub fn status(&self) -> CommandStatus {
        self.status
    }

    /// Overwrite the aggregate directly.
    ///
    /// This is the sequence driver's central control: it is the only way
    /// to leave the sticky `Running` state.
    pub fn set_status(&mut self, status: CommandStatus) {
        self.status = status;
    }

    /// When the sequence started
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// When the sequence finished, `None` while it has not
    pub fn stop_time(&self) -> Option<SystemTime> {
        self.stop_time
    }

    /// Record a fresh start: start time now, stop time cleared
    pub fn mark_started(&mut self) {
        self.start_time = SystemTime::now();
        self.stop_time = None;
    }

    /// Record the finish time
    pub fn mark_stopped(&mut self) {
        self.stop_time = Some(SystemTime::now());
    }

    /// Submit a step snapshot and fold its status into the aggregate.
    ///
    /// While the aggregate is `Running` the fold is skipped entirely; step
    /// submissions still record their snapshot, but only
    /// [`set_status`](Self::set_status) moves the aggregate on. Otherwise
    /// the rule is a worsening ratchet: error is terminal, warning never
    /// downgrades to success, and a not-executed submission leaves the
    /// aggregate untouched.
    pub fn update_step(&mut self, step: &dyn Command) {
        let Some(number) = step.number() else {
            debug!("ignoring unnumbered step '{}'", step.name());
            return;
        };

        self.step_states.insert(
            number,
            StepState {
                number,
                name: step.name().to_string(),
                status: step.status(),
                output: step.output().to_string(),
                duration: step.exec_time(),
                error: step.error_output().to_string(),
                strategy: step.strategy(),
            },
        );

        if self.status == CommandStatus::Running {
            return;
        }

        let previous = self.status;
        self.status = match step.status() {
            CommandStatus::Running => CommandStatus::Running,
            CommandStatus::Error => CommandStatus::Error,
            CommandStatus::Warning => match previous {
                CommandStatus::Error => CommandStatus::Error,
                _ => CommandStatus::Warning,
            },
            CommandStatus::Success => match previous {
                CommandStatus::Error => CommandStatus::Error,
                CommandStatus::Warning => CommandStatus::Warning,
                _ => CommandStatus::Success,
            },
            CommandStatus::NotExecuted => previous,
        };
    }

    /// Snapshot of the step with the given number, if one was submitted
    pub fn step_state(&self, number: usize) -> Option<&StepState> {
        self.step_states.get(&number)
    }

    /// All step snapshots, in ascending step order
    pub fn step_states(&self) -> &BTreeMap<usize, StepState> {
        &self.step_states
    }

    /// Whether the sequence has been run at all
    pub fn executed(&self) -> bool {
        self.status != CommandStatus::NotExecuted
    }

    /// Whether the sequence is currently running
    pub fn running(&self) -> bool {
        self.status == CommandStatus::Running
    }

    /// Whether the aggregate is success
    pub fn success(&self) -> bool {
        self.status == CommandStatus::Success
    }

    /// Whether the sequence has nothing left to do.
    ///
    /// True once a fail-on-error step errored or a fail-on-warning step
    /// warned, or once every step reached a terminal state.
    pub fn completed(&self) -> bool {
        if !self.executed() {
            return false;
        }

        for state in self.step_states.values() {
            if state.status == CommandStatus::Error
                && state.strategy == Some(ExitStrategy::FailOnError)
            {
                return true;
            }
            if state.status == CommandStatus::Warning
                && state.strategy == Some(ExitStrategy::FailOnWarning)
            {
                return true;
            }
        }

        !self.step_states.values().any(|state| {
            matches!(
                state.status,
                CommandStatus::NotExecuted | CommandStatus::Running
            )
        })
    }

    /// Deterministic multi-line report: sequence line first, then one line
    /// per step in ascending step order.
    pub fn summary(&self) -> String {
        let mut sum = String::new();

        if let Some(id) = &self.sequence_id {
            sum.push_str(&format!("{}: ", id));
        }
        sum.push_str(&format!("{} - {}", self.sequence_name, self.status));

        for state in self.step_states.values() {
            sum.push_str(&format!(
                "\n  step {}: {} - {}",
                state.number, state.name, state.status
            ));
        }

        sum
    }
}

impl fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
