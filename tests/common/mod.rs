//! Common test utilities

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory holding a sequence definition file
pub fn create_sequence_file(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("sequence.yml");
    fs::write(&file_path, content).unwrap();
    (temp_dir, file_path)
}
