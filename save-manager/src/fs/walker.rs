//! Directory traversal that fixes the file manifest of an archive job.
//!
//! The walk is depth-first in directory-listing order, which is not sorted.
//! Only regular files (and symlinks resolving to regular files) become
//! manifest entries; directories are implied by the entry paths.

use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Subtrees to leave out (compared against walked paths verbatim)
    pub exclude: Vec<PathBuf>,
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// File size in bytes at discovery time
    pub size: u64,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// For symlinks, resolves to the target to get the real file size.
    /// Returns None for directories, symlinks to directories and broken symlinks.
    fn from_entry(entry: &DirEntry, root: &Path) -> Option<Self> {
        let path = entry.path().to_path_buf();

        let size = if entry.file_type().is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_file() => resolved.len(),
                _ => return None,
            }
        } else if entry.file_type().is_file() {
            entry.metadata().map(|m| m.len()).unwrap_or(0)
        } else {
            return None;
        };

        let relative_path = path.strip_prefix(root).ok()?.to_path_buf();

        Some(Self {
            path,
            relative_path,
            size,
        })
    }
}

/// Every file of one archive job, computed before any byte is written.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub root: PathBuf,

    /// Last component of the root, prefixed to every entry name
    pub root_name: String,

    pub files: Vec<FileInfo>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Archive entry name for a manifest file.
    pub fn entry_name(&self, file: &FileInfo) -> String {
        entry_name(&self.root_name, &file.relative_path)
    }
}

/// `<root_name>/<relative>` with `/` separators on every platform.
pub fn entry_name(root_name: &str, relative: &Path) -> String {
    let mut name = String::from(root_name);
    for component in relative.components() {
        if let Component::Normal(part) = component {
            name.push('/');
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

/// Walk `root` and collect its files.
///
/// The root itself must be a readable directory. Subdirectories that cannot
/// be read, or vanish during the walk, are skipped.
pub fn build_manifest(root: &Path, options: &WalkOptions) -> io::Result<Manifest> {
    let metadata = std::fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        ));
    }

    let root_name = root_name(root);
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !options.exclude.iter().any(|x| e.path() == x));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable path under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root) {
            files.push(file_info);
        }
    }

    Ok(Manifest {
        root: root.to_path_buf(),
        root_name,
        files,
    })
}

fn root_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            root.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "world".to_string())
}
