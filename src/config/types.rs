//! Sequence definition types
//!
//! These structures mirror the YAML layout of a sequence file. They only
//! describe process steps; block steps are code-level constructs added
//! through the API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level sequence definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SequenceConfig {
    /// Sequence name
    pub name: String,

    /// Informational runner name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,

    /// External identifier of the sequence run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Optional dotenv file loaded before interpolation, relative to the
    /// sequence file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,

    /// Variables available to `${var}` interpolation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,

    /// Steps to execute, in order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// A step entry - either a bare command string or a detailed mapping
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StepConfig {
    /// Simple command string with all defaults
    Simple(String),

    /// Command with explicit settings
    Detailed(StepDetail),
}

/// A step with explicit settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepDetail {
    /// Command line to execute
    pub command: String,

    /// Display name (defaults to the command line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Seconds before the step is killed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Directory the step runs in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Exit-strategy token; unrecognized values fall back to
    /// `fail_on_error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl StepConfig {
    /// The command line of this step
    pub fn command(&self) -> &str {
        match self {
            StepConfig::Simple(command) => command,
            StepConfig::Detailed(detail) => &detail.command,
        }
    }

    /// The display name, falling back to the command line
    pub fn name(&self) -> &str {
        match self {
            StepConfig::Simple(command) => command,
            StepConfig::Detailed(detail) => detail.name.as_deref().unwrap_or(&detail.command),
        }
    }

    /// The timeout in seconds, if any
    pub fn timeout(&self) -> Option<u64> {
        match self {
            StepConfig::Simple(_) => None,
            StepConfig::Detailed(detail) => detail.timeout,
        }
    }

    /// The working directory, if set
    pub fn working_directory(&self) -> Option<&str> {
        match self {
            StepConfig::Simple(_) => None,
            StepConfig::Detailed(detail) => detail.working_directory.as_deref(),
        }
    }

    /// The exit-strategy token, if set
    pub fn strategy(&self) -> Option<&str> {
        match self {
            StepConfig::Simple(_) => None,
            StepConfig::Detailed(detail) => detail.strategy.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_step_accessors() {
        let step = StepConfig::Simple("echo hello".to_string());
        assert_eq!(step.command(), "echo hello");
        assert_eq!(step.name(), "echo hello");
        assert!(step.timeout().is_none());
        assert!(step.strategy().is_none());
    }

    #[test]
    fn test_detailed_step_accessors() {
        let step = StepConfig::Detailed(StepDetail {
            command: "make all".to_string(),
            name: Some("build".to_string()),
            timeout: Some(300),
            working_directory: Some("build/".to_string()),
            strategy: Some("flunk_on_error".to_string()),
        });

        assert_eq!(step.command(), "make all");
        assert_eq!(step.name(), "build");
        assert_eq!(step.timeout(), Some(300));
        assert_eq!(step.working_directory(), Some("build/"));
        assert_eq!(step.strategy(), Some("flunk_on_error"));
    }

    #[test]
    fn test_detailed_step_name_falls_back_to_command() {
        let step = StepConfig::Detailed(StepDetail {
            command: "make all".to_string(),
            name: None,
            timeout: None,
            working_directory: None,
            strategy: None,
        });

        assert_eq!(step.name(), "make all");
    }
}
