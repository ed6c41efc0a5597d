use std::path::{Path, PathBuf};

/// a scratch image path under the temp directory,
/// removed before the test starts and again when dropped
pub struct TestImage {
    path: PathBuf,
}

impl TestImage {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "ecsfs_{}_{}.img",
            name,
            std::process::id()
        ));
        if path.exists() {
            std::fs::remove_file(&path).expect("Failed to remove stale test image");
        }
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TestImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
