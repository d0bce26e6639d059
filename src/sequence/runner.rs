//! Sequential step runner
//!
//! [`CommandSequence`] owns an ordered list of steps and runs them one at
//! a time on the caller's thread, applying each step's exit strategy and
//! broadcasting status snapshots to registered observers.

use log::debug;

use crate::command::{Command, CommandStatus, Context, ExitStrategy};
use crate::sequence::status::SequenceStatus;

/// Observer callback receiving the current status snapshot on every
/// transition: sequence start, each step start, each step's pre-result
/// re-announcement, sequence end, reset, and step addition.
pub type SequenceObserver = Box<dyn FnMut(&SequenceStatus)>;

/// An ordered list of steps run strictly one after another.
///
/// Steps are added by value-cloning, so the sequence owns independent
/// instances and the caller's originals are never mutated. Step failures
/// never surface as errors from [`run`](Self::run); callers inspect the
/// resulting [`SequenceStatus`].
pub struct CommandSequence {
    name: String,
    sequence_runner: String,
    sequence_id: Option<String>,
    steps: Vec<Box<dyn Command>>,
    state: SequenceStatus,
    observers: Vec<SequenceObserver>,
}

impl CommandSequence {
    /// Create an empty sequence
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let state = SequenceStatus::new(name.clone());

        CommandSequence {
            name,
            sequence_runner: String::new(),
            sequence_id: None,
            steps: Vec::new(),
            state,
            observers: Vec::new(),
        }
    }

    /// Set the informational runner name
    pub fn with_runner(mut self, runner: impl Into<String>) -> Self {
        self.sequence_runner = runner.into();
        self.state.set_sequence_runner(self.sequence_runner.clone());
        self
    }

    /// Set the external identifier for this sequence
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.sequence_id = Some(id.clone());
        self.state.set_sequence_id(id);
        self
    }

    /// Name of the sequence
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Informational runner name
    pub fn sequence_runner(&self) -> &str {
        &self.sequence_runner
    }

    /// External identifier, if set
    pub fn sequence_id(&self) -> Option<&str> {
        self.sequence_id.as_deref()
    }

    /// Current aggregate status
    pub fn state(&self) -> &SequenceStatus {
        &self.state
    }

    /// Number of owned steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// The owned step at the given position
    pub fn step(&self, number: usize) -> Option<&dyn Command> {
        self.steps.get(number).map(|step| step.as_ref())
    }

    /// Register an observer for status-change notifications
    pub fn add_observer(&mut self, observer: impl FnMut(&SequenceStatus) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self) {
        for observer in &mut self.observers {
            observer(&self.state);
        }
    }

    /// Add a step with the default `FailOnError` strategy.
    ///
    /// See [`add_step_with_strategy`](Self::add_step_with_strategy).
    pub fn add_step(&mut self, step: &dyn Command) -> &dyn Command {
        self.add_step_with_strategy(step, ExitStrategy::default())
    }

    /// Clone the given step into the sequence.
    ///
    /// The clone is reset, numbered with its position, tagged with the
    /// exit strategy and registered with the aggregate. A reference to the
    /// owned clone is returned; the caller's original stays untouched.
    pub fn add_step_with_strategy(
        &mut self,
        step: &dyn Command,
        strategy: ExitStrategy,
    ) -> &dyn Command {
        let index = self.steps.len();

        let mut owned = step.boxed_clone();
        owned.reset();
        owned.set_number(index);
        owned.set_strategy(strategy);

        self.state.update_step(owned.as_ref());
        self.steps.push(owned);
        self.notify();

        self.steps[index].as_ref()
    }

    /// Run the steps in insertion order.
    ///
    /// The aggregate goes `Running` for the duration; each step's result
    /// is folded into the final outcome according to its exit strategy.
    /// `Fail*` strategies stop the run immediately, leaving later steps
    /// untouched; `Flunk*` strategies keep running with a poisoned
    /// outcome. An empty sequence finishes as `Warning`, never `Success`.
    ///
    /// Step failures never propagate as errors; the returned reference
    /// points at the final status.
    pub fn run(&mut self, context: Option<&Context>) -> &SequenceStatus {
        debug!("sequence '{}' starting with {} steps", self.name, self.steps.len());

        self.state.set_status(CommandStatus::Running);
        self.state.mark_started();
        self.notify();

        let mut outcome = CommandStatus::Success;
        if self.steps.is_empty() {
            outcome = CommandStatus::Warning;
        }

        for index in 0..self.steps.len() {
            // announce the step as running
            self.steps[index].set_status(CommandStatus::Running);
            self.state.update_step(self.steps[index].as_ref());
            self.notify();

            let result = self.steps[index].run(context);

            // Re-announce as still running: observers get a "final
            // dispatch" event for the step before its terminal state
            // becomes visible with a later notification.
            self.steps[index].set_status(CommandStatus::Running);
            self.state.update_step(self.steps[index].as_ref());
            self.notify();

            // record the terminal snapshot without a notification of its own
            self.steps[index].set_status(result);
            self.state.update_step(self.steps[index].as_ref());

            let strategy = self.steps[index].strategy().unwrap_or_default();
            match result {
                CommandStatus::Error => {
                    debug!(
                        "step {} '{}' failed ({})",
                        index,
                        self.steps[index].name(),
                        strategy
                    );
                    outcome = CommandStatus::Error;
                    if strategy == ExitStrategy::FailOnError {
                        self.state.set_status(CommandStatus::Error);
                        break;
                    }
                }
                CommandStatus::Warning => {
                    debug!(
                        "step {} '{}' warned ({})",
                        index,
                        self.steps[index].name(),
                        strategy
                    );
                    if outcome != CommandStatus::Error {
                        outcome = CommandStatus::Warning;
                    }
                    if strategy == ExitStrategy::FlunkOnWarning {
                        outcome = CommandStatus::Error;
                    }
                    if strategy == ExitStrategy::FailOnWarning {
                        self.state.set_status(CommandStatus::Error);
                        break;
                    }
                }
                _ => {}
            }
        }

        self.state.mark_stopped();
        self.state.set_status(outcome);
        self.notify();

        debug!("sequence '{}' finished: {}", self.name, outcome);
        &self.state
    }

    /// Reset the sequence for another run.
    ///
    /// Every owned step is reset and a brand-new status is seeded with the
    /// reset snapshots. The runner name and identifier are preserved.
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.reset();
        }

        let mut state = SequenceStatus::new(self.name.clone());
        state.set_sequence_runner(self.sequence_runner.clone());
        if let Some(id) = &self.sequence_id {
            state.set_sequence_id(id.clone());
        }
        for step in &self.steps {
            state.update_step(step.as_ref());
        }

        self.state = state;
        self.notify();
    }
}
