//! I/O boundary traits
//!
//! Services reach documents only through these, so tests can swap in
//! in-memory file systems or alternative codecs.

use std::io;
use std::path::{Path, PathBuf};

use crate::domain::AttackTree;
use crate::infrastructure::xml::CodecResult;

/// File access needed to load and store documents.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.create_dir_all(parent),
            _ => Ok(()),
        }
    }

    /// Writes `content` to the sibling `<name>.tmp`, then renames it over
    /// `path`. An existing document is left intact if the write fails.
    fn replace(&self, path: &Path, content: &str) -> io::Result<()> {
        self.ensure_parent(path)?;
        let staging = staging_path(path);
        self.write(&staging, content)?;
        self.rename(&staging, path)
    }
}

/// `<name>.tmp` next to `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialized form of an attack tree.
pub trait TreeCodec: Send + Sync {
    /// Builds a tree from a document; partial trees are never returned.
    fn decode(&self, text: &str) -> CodecResult<AttackTree>;

    /// Serializes `tree`. Takes `&mut` because the form check records
    /// whether the tree is extended.
    fn encode(&self, tree: &mut AttackTree) -> CodecResult<String>;
}

/// `std::fs` backed implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}
