//! Integration tests for sequence execution with real steps

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use stepseq::{
    BlockCommand, Command, CommandSequence, CommandState, CommandStatus, Context, ExitStrategy,
    ProcessCommand, ProcessOptions,
};

fn shell_step(name: &str, command: &str) -> ProcessCommand {
    ProcessCommand::new(ProcessOptions {
        command: command.to_string(),
        name: name.to_string(),
        ..ProcessOptions::default()
    })
    .unwrap()
}

#[test]
fn test_fail_on_error_stops_with_real_processes() {
    let mut sequence = CommandSequence::new("halting");
    sequence.add_step(&shell_step("greet", "echo ok"));
    sequence.add_step_with_strategy(&shell_step("break", "false"), ExitStrategy::FailOnError);
    sequence.add_step(&shell_step("never", "echo never"));

    let status = sequence.run(None);

    assert_eq!(status.status(), CommandStatus::Error);
    assert_eq!(status.step_state(0).unwrap().output, "ok\n");
    assert_eq!(status.step_state(1).unwrap().status, CommandStatus::Error);
    assert_eq!(
        status.step_state(2).unwrap().status,
        CommandStatus::NotExecuted
    );
    assert!(status.completed());
}

#[test]
fn test_flunk_on_error_runs_everything() {
    let mut sequence = CommandSequence::new("flunking");
    sequence.add_step_with_strategy(&shell_step("break", "false"), ExitStrategy::FlunkOnError);
    sequence.add_step(&shell_step("still", "echo still here"));

    let status = sequence.run(None);

    assert_eq!(status.status(), CommandStatus::Error);
    assert_eq!(status.step_state(1).unwrap().output, "still here\n");
    assert!(status.completed());
}

#[test]
fn test_mixed_process_and_block_steps() {
    let block = BlockCommand::new("collector", |cmd| {
        cmd.append_output("from the block");
        Ok(())
    })
    .unwrap();

    let mut sequence = CommandSequence::new("mixed");
    sequence.add_step(&shell_step("shell", "echo from the shell"));
    sequence.add_step(&block);

    let status = sequence.run(None);

    assert_eq!(status.status(), CommandStatus::Success);
    assert_eq!(status.step_state(0).unwrap().output, "from the shell\n");
    assert_eq!(status.step_state(1).unwrap().output, "from the block");
}

#[test]
fn test_block_failure_honors_strategy() {
    let boom = BlockCommand::new("boom", |_| Err(anyhow!("boom"))).unwrap();

    let mut sequence = CommandSequence::new("block failure");
    sequence.add_step_with_strategy(&boom, ExitStrategy::FailOnError);
    sequence.add_step(&shell_step("never", "echo never"));

    let status = sequence.run(None);

    assert_eq!(status.status(), CommandStatus::Error);
    assert_eq!(status.step_state(0).unwrap().error, "\nboom");
    assert_eq!(
        status.step_state(1).unwrap().status,
        CommandStatus::NotExecuted
    );
}

#[test]
fn test_context_reaches_block_steps() {
    let reader = BlockCommand::new("reader", |cmd| {
        let greeting = cmd
            .context()
            .and_then(|ctx| ctx.get_var("greeting").cloned())
            .unwrap_or_default();
        cmd.append_output(&greeting);
        Ok(())
    })
    .unwrap();

    let mut sequence = CommandSequence::new("context");
    sequence.add_step(&reader);

    let mut ctx = Context::new();
    ctx.set_var("greeting", "hello context");
    let status = sequence.run(Some(&ctx));

    assert_eq!(status.step_state(0).unwrap().output, "hello context");
}

/// A caller-defined step type: anything implementing the trait can be
/// sequenced alongside the built-in commands.
#[derive(Clone)]
struct CountingCommand {
    state: CommandState,
    runs: Rc<RefCell<usize>>,
}

impl Command for CountingCommand {
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
        *self.runs.borrow_mut() += 1;
        self.state.status = CommandStatus::Success;
        self.state.status
    }
    fn reset(&mut self) {
        self.state.reset();
    }
    fn boxed_clone(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }
}

#[test]
fn test_custom_command_types_are_sequenced() {
    let runs = Rc::new(RefCell::new(0usize));
    let counter = CountingCommand {
        state: CommandState::new("counter"),
        runs: Rc::clone(&runs),
    };

    let mut sequence = CommandSequence::new("custom");
    sequence.add_step(&counter);
    sequence.add_step(&counter);

    let status = sequence.run(None);

    assert_eq!(status.status(), CommandStatus::Success);
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn test_observer_event_stream() {
    let mut sequence = CommandSequence::new("observed");
    sequence.add_step(&shell_step("a", "echo a"));
    sequence.add_step(&shell_step("b", "echo b"));

    let events: Rc<RefCell<Vec<CommandStatus>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    sequence.add_observer(move |status| sink.borrow_mut().push(status.status()));

    sequence.run(None);

    let events = events.borrow();
    // sequence start + two notifications per step + sequence end
    assert_eq!(events.len(), 6);
    assert!(events[..5]
        .iter()
        .all(|status| *status == CommandStatus::Running));
    assert_eq!(events[5], CommandStatus::Success);
}

#[test]
fn test_reset_allows_a_clean_rerun() {
    let mut sequence = CommandSequence::new("again");
    sequence.add_step(&shell_step("greet", "echo ok"));

    let first = sequence.run(None).status();
    assert_eq!(first, CommandStatus::Success);

    sequence.reset();
    assert_eq!(sequence.state().status(), CommandStatus::NotExecuted);
    assert!(!sequence.state().completed());

    let second = sequence.run(None).status();
    assert_eq!(second, CommandStatus::Success);
}
