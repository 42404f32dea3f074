//! Common test utilities and fixtures

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture paths and utilities
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
    pub data_dir: PathBuf,
    pub configs_dir: PathBuf,
}

impl TestFixtures {
    /// Get the test fixtures directory
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

        Self {
            data_dir: fixtures_dir.join("data"),
            configs_dir: fixtures_dir.join("configs"),
            fixtures_dir,
        }
    }

    /// Get path to a test data file
    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Get path to a test config file
    pub fn config_file(&self, name: &str) -> PathBuf {
        self.configs_dir.join(name)
    }
}

/// Temporary working directory holding a local rowdelta.toml
pub struct TestWorkspace {
    /// Keeps the directory alive for the workspace's lifetime
    _temp_dir: TempDir,
    pub path: PathBuf,
    pub config_path: PathBuf,
}

impl TestWorkspace {
    /// Create a new test workspace with the specified config
    pub fn new(config_name: &str) -> Self {
        let fixtures = TestFixtures::new();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().to_path_buf();

        let config_content = fs::read_to_string(fixtures.config_file(config_name))
            .expect("Failed to read config file");

        // Point output directories inside the temp workspace
        let output_dir = path.join("outputs");
        let updated_config = config_content.replace(
            "directory = \"outputs\"",
            &format!("directory = \"{}\"", output_dir.to_string_lossy()),
        );

        let config_path = path.join("rowdelta.toml");
        fs::write(&config_path, updated_config).expect("Failed to write config file");

        Self {
            _temp_dir: temp_dir,
            path,
            config_path,
        }
    }

    /// Copy a test data file to the workspace
    pub fn copy_data_file(&self, data_file_name: &str, target_name: &str) -> PathBuf {
        let fixtures = TestFixtures::new();
        let source = fixtures.data_file(data_file_name);
        let target = self.path.join(target_name);

        fs::copy(&source, &target).expect("Failed to copy data file");

        target
    }

    /// Get the workspace path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path.join("outputs")
    }
}

/// Read a CSV output file back as lines
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read output file")
        .lines()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_exist() {
        let fixtures = TestFixtures::new();
        assert!(fixtures.fixtures_dir.exists());
        assert!(fixtures.data_dir.exists());
        assert!(fixtures.configs_dir.exists());

        assert!(fixtures.data_file("old.csv").exists());
        assert!(fixtures.config_file("local.toml").exists());
    }

    #[test]
    fn test_workspace_creation() {
        let workspace = TestWorkspace::new("local.toml");
        assert!(workspace.path().exists());
        assert!(workspace.config_path.exists());

        let data_file = workspace.copy_data_file("old.csv", "old.csv");
        assert!(data_file.exists());
    }
}
