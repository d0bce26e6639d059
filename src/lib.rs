//! stepseq - project-automation primitives
//!
//! stepseq provides a uniform abstraction for runnable steps (shell
//! commands or in-process closures), a sequence runner that executes
//! steps one at a time honoring per-step failure policies, and a small
//! YAML-based sequence loader.
//!
//! Execution is strictly sequential and synchronous on the caller's
//! thread. The only internal concurrency lives inside a single
//! [`ProcessCommand`] run: pipe-draining threads and the timeout watch.
//! Step failures never propagate as errors; callers inspect the resulting
//! status instead.

// Public modules
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod sequence;

// Re-export commonly used types
pub use command::{
    BlockCommand, Command, CommandState, CommandStatus, Context, ExitStrategy, ProcessCommand,
    ProcessOptions,
};
pub use error::{ParameterError, Result, StepseqError};
pub use sequence::{CommandSequence, SequenceStatus, StepState};

/// Current version of stepseq
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
