use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.root.path().join(name), content).unwrap();
    }

    /// Provider configuration pointing at a mock endpoint
    pub fn write_config(&self, endpoint: &str) {
        self.write_file(
            "nimbus.yaml",
            &format!("endpoint: {endpoint}\ntoken: test-token\n"),
        );
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.root.path().join(name)).unwrap()
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
