//! Where synced notes live
//!
//! Paths handed to a [`DocumentStore`] are relative to the store root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Folder and note storage used by the reconciler
pub trait DocumentStore {
    fn exists(&self, path: &Path) -> bool;

    /// Create a folder; an existing folder is not an error
    fn create_folder(&mut self, path: &Path) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<String>;

    /// Create a new note; fails if it already exists
    fn create(&mut self, path: &Path, content: &str) -> io::Result<()>;

    /// Replace the content of an existing note
    fn modify(&mut self, path: &Path, content: &str) -> io::Result<()>;
}

/// Store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl DocumentStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn create_folder(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path))
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.resolve(path))
    }

    fn create(&mut self, path: &Path, content: &str) -> io::Result<()> {
        use io::Write;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.resolve(path))?;
        file.write_all(content.as_bytes())
    }

    fn modify(&mut self, path: &Path, content: &str) -> io::Result<()> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not an existing note", full.display()),
            ));
        }
        fs::write(full, content)
    }
}
