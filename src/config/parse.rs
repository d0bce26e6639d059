//! Sequence file loading
//!
//! Parses YAML sequence definitions and builds runnable
//! [`CommandSequence`]s out of them. The loader is the only place that
//! raises configuration errors; once a sequence is built it carries no
//! trace of where it came from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::command::{ExitStrategy, ProcessCommand, ProcessOptions};
use crate::config::interpolate::interpolate;
use crate::config::types::SequenceConfig;
use crate::error::{ConfigError, ConfigResult, StepseqError};
use crate::sequence::CommandSequence;

/// Parse a sequence definition from a string
pub fn parse_sequence(yaml: &str) -> Result<SequenceConfig, StepseqError> {
    let config: SequenceConfig = serde_yaml::from_str(yaml)?;
    validate_sequence(&config)?;
    Ok(config)
}

/// Parse a sequence definition file
pub fn parse_sequence_file(path: &Path) -> Result<SequenceConfig, StepseqError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    parse_sequence(&contents)
}

/// Validate a parsed sequence definition
pub fn validate_sequence(config: &SequenceConfig) -> ConfigResult<()> {
    if config.steps.is_empty() {
        return Err(ConfigError::NoSteps(config.name.clone()));
    }

    for (number, step) in config.steps.iter().enumerate() {
        if step.command().trim().is_empty() {
            return Err(ConfigError::EmptyCommandLine(number));
        }
    }

    Ok(())
}

/// Build a runnable sequence from a definition.
///
/// Command lines and working directories are interpolated against the
/// definition's `vars`, falling back to the process environment. The
/// `env_file`, if any, is resolved relative to `base_dir` and loaded
/// before interpolation.
pub fn build_sequence(
    config: &SequenceConfig,
    base_dir: &Path,
) -> Result<CommandSequence, StepseqError> {
    if let Some(env_file) = &config.env_file {
        let env_path = base_dir.join(env_file);
        dotenvy::from_path(&env_path).map_err(|e| ConfigError::EnvFile {
            path: env_path.clone(),
            error: e.to_string(),
        })?;
        debug!("loaded environment file {}", env_path.display());
    }

    let mut sequence = CommandSequence::new(config.name.clone());
    if let Some(runner) = &config.runner {
        sequence = sequence.with_runner(runner.clone());
    }
    if let Some(id) = &config.id {
        sequence = sequence.with_id(id.clone());
    }

    for step in &config.steps {
        let command = interpolate(step.command(), &config.vars).map_err(ConfigError::from)?;
        let working_directory = match step.working_directory() {
            Some(dir) => {
                PathBuf::from(interpolate(dir, &config.vars).map_err(ConfigError::from)?)
            }
            None => PathBuf::from("."),
        };

        let process = ProcessCommand::new(ProcessOptions {
            command,
            name: step.name().to_string(),
            working_directory,
            timeout: step.timeout().map(Duration::from_secs),
        })?;

        let strategy = step
            .strategy()
            .map(ExitStrategy::parse)
            .unwrap_or_default();
        sequence.add_step_with_strategy(&process, strategy);
    }

    debug!(
        "built sequence '{}' with {} steps",
        config.name,
        sequence.step_count()
    );

    Ok(sequence)
}

/// Load a sequence file and build the runnable sequence in one go
pub fn load_sequence(path: &Path) -> Result<CommandSequence, StepseqError> {
    let config = parse_sequence_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    build_sequence(&config, base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn test_parse_simple_definition() {
        let yaml = r#"
name: smoke
steps:
  - echo hello
  - command: make all
    name: build
    timeout: 300
"#;
        let config = parse_sequence(yaml).unwrap();
        assert_eq!(config.name, "smoke");
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.steps[0].command(), "echo hello");
        assert_eq!(config.steps[1].name(), "build");
        assert_eq!(config.steps[1].timeout(), Some(300));
    }

    #[test]
    fn test_definition_without_steps_is_rejected() {
        let yaml = r#"
name: hollow
steps: []
"#;
        let result = parse_sequence(yaml);
        assert!(matches!(
            result,
            Err(StepseqError::Config(ConfigError::NoSteps(_)))
        ));
    }

    #[test]
    fn test_empty_command_line_is_rejected() {
        let yaml = r#"
name: blank
steps:
  - command: "  "
"#;
        let result = parse_sequence(yaml);
        assert!(matches!(
            result,
            Err(StepseqError::Config(ConfigError::EmptyCommandLine(0)))
        ));
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let result = parse_sequence("steps: [unterminated");
        assert!(matches!(result, Err(StepseqError::Yaml(_))));
    }

    #[test]
    fn test_build_sequence_interpolates_vars() {
        let yaml = r#"
name: interpolated
vars:
  greeting: hello
steps:
  - echo ${greeting}
"#;
        let config = parse_sequence(yaml).unwrap();
        let mut sequence = build_sequence(&config, Path::new(".")).unwrap();
        assert_eq!(sequence.step_count(), 1);

        let status = sequence.run(None);
        assert_eq!(status.status(), crate::command::CommandStatus::Success);
        assert_eq!(status.step_state(0).unwrap().output, "hello\n");
    }

    #[test]
    fn test_build_sequence_applies_strategy_tokens() {
        let yaml = r#"
name: strategies
steps:
  - command: make all
    strategy: flunk_on_warning
  - command: make test
    strategy: not_a_real_strategy
"#;
        let config = parse_sequence(yaml).unwrap();
        let sequence = build_sequence(&config, Path::new(".")).unwrap();

        assert_eq!(
            sequence.step(0).unwrap().strategy(),
            Some(ExitStrategy::FlunkOnWarning)
        );
        // unrecognized tokens normalize to the default
        assert_eq!(
            sequence.step(1).unwrap().strategy(),
            Some(ExitStrategy::FailOnError)
        );
    }

    #[test]
    fn test_build_sequence_carries_runner_and_id() {
        let yaml = r#"
name: tagged
runner: build-host
id: "run-42"
steps:
  - echo hello
"#;
        let config = parse_sequence(yaml).unwrap();
        let sequence = build_sequence(&config, Path::new(".")).unwrap();

        assert_eq!(sequence.sequence_runner(), "build-host");
        assert_eq!(sequence.sequence_id(), Some("run-42"));
        assert_eq!(sequence.state().sequence_id(), Some("run-42"));
    }
}
