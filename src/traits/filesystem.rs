use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::sync::{Arc, RwLock};

/// Trait for filesystem operations to enable testing with mocks
pub trait FileSystem: Send + Sync {
    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string contents to file, creating parent directories
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Create directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write contents to a new, uniquely named file in the temp directory.
    /// The file is kept after the call; its path is returned.
    fn write_temp(&self, prefix: &str, suffix: &str, contents: &str) -> Result<PathBuf>;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read directory entries
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Files matching a glob pattern, sorted
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// Real filesystem implementation using std::fs
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
        }

        std::fs::write(path, contents).with_context(|| format!("Failed to write file: {:?}", path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {:?}", path))
    }

    fn write_temp(&self, prefix: &str, suffix: &str, contents: &str) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()
            .context("Failed to create temporary file")?;

        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write temporary file: {:?}", file.path()))?;

        let (_, path) = file.keep().context("Failed to keep temporary file")?;
        Ok(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {:?}", path))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            paths.push(entry.path());
        }

        Ok(paths)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let entries =
            glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read glob match")?;
            if path.is_file() {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

/// Mock filesystem implementation for testing (in-memory)
#[allow(dead_code)]
pub struct MockFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
    directories: Arc<RwLock<HashMap<PathBuf, ()>>>,
    temp_files: Arc<RwLock<Vec<PathBuf>>>,
}

#[allow(dead_code)]
impl MockFileSystem {
    /// Create new empty mock filesystem
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            directories: Arc::new(RwLock::new(HashMap::new())),
            temp_files: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Temp files written so far, in order
    pub fn temp_files(&self) -> Vec<PathBuf> {
        self.temp_files.read().unwrap().clone()
    }

    /// Get captured file contents for testing assertions
    pub fn get_file_contents(&self, path: &Path) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("File not found in mock filesystem: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }

        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut directories = self.directories.write().unwrap();
        directories.insert(path.to_path_buf(), ());

        let mut current = path;
        while let Some(parent) = current.parent() {
            directories.insert(parent.to_path_buf(), ());
            current = parent;
        }

        Ok(())
    }

    fn write_temp(&self, prefix: &str, suffix: &str, contents: &str) -> Result<PathBuf> {
        let path = {
            let mut temp_files = self.temp_files.write().unwrap();
            let path = PathBuf::from("/tmp").join(format!("{}{}{}", prefix, temp_files.len(), suffix));
            temp_files.push(path.clone());
            path
        };

        self.write(&path, contents)?;
        Ok(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.read().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.read().unwrap();
        let directories = self.directories.read().unwrap();

        let mut entries: Vec<PathBuf> = files
            .keys()
            .chain(directories.keys())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();

        // HashMap order is random; keep listings stable
        entries.sort();
        Ok(entries)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = glob::Pattern::new(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;

        let mut paths: Vec<PathBuf> = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|p| pattern.matches_path(p))
            .cloned()
            .collect();

        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_read_dir_lists_direct_children() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/configs/b.yaml"), "b").unwrap();
        fs.write(Path::new("/configs/a.yaml"), "a").unwrap();
        fs.write(Path::new("/configs/nested/c.yaml"), "c").unwrap();

        let entries = fs.read_dir(Path::new("/configs")).unwrap();

        assert_eq!(
            entries,
            vec![
                PathBuf::from("/configs/a.yaml"),
                PathBuf::from("/configs/b.yaml"),
                PathBuf::from("/configs/nested"),
            ]
        );
        assert!(fs.is_dir(Path::new("/configs/nested")));
    }

    #[test]
    fn test_write_temp_never_reuses_a_path() {
        let fs = RealFileSystem;

        let first = fs.write_temp("cft-test-p.net-", ".yaml", "first").unwrap();
        let second = fs.write_temp("cft-test-p.net-", ".yaml", "second").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs.read_to_string(&first).unwrap(), "first");
        assert_eq!(fs.read_to_string(&second).unwrap(), "second");
        assert!(first.file_name().unwrap().to_string_lossy().starts_with("cft-test-p.net-"));
        assert_eq!(second.extension().unwrap(), "yaml");

        std::fs::remove_file(first).unwrap();
        std::fs::remove_file(second).unwrap();
    }

    #[test]
    fn test_mock_write_temp() {
        let fs = MockFileSystem::new();

        let first = fs.write_temp("p.net-", ".yaml", "a").unwrap();
        let second = fs.write_temp("p.net-", ".yaml", "b").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs.temp_files(), vec![first.clone(), second]);
        assert_eq!(fs.get_file_contents(&first).as_deref(), Some("a"));
    }

    #[test]
    fn test_mock_glob() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/configs/net.yaml"), "").unwrap();
        fs.write(Path::new("/configs/vm.yaml"), "").unwrap();
        fs.write(Path::new("/configs/readme.md"), "").unwrap();

        let matches = fs.glob("/configs/*.yaml").unwrap();

        assert_eq!(
            matches,
            vec![PathBuf::from("/configs/net.yaml"), PathBuf::from("/configs/vm.yaml")]
        );
    }
}
