//! Directory listings and their cache.

use std::collections::HashSet;
use std::fs::{self, FileType};
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    BlockDevice,
    CharDevice,
    Directory,
    Fifo,
    Socket,
    Symlink,
    Regular,
    Other,
}

impl FileCategory {
    /// Category of a file type obtained without following symlinks.
    pub fn from_file_type(ft: FileType) -> Self {
        if ft.is_symlink() {
            FileCategory::Symlink
        } else if ft.is_dir() {
            FileCategory::Directory
        } else if ft.is_file() {
            FileCategory::Regular
        } else if ft.is_block_device() {
            FileCategory::BlockDevice
        } else if ft.is_char_device() {
            FileCategory::CharDevice
        } else if ft.is_fifo() {
            FileCategory::Fifo
        } else if ft.is_socket() {
            FileCategory::Socket
        } else {
            FileCategory::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub category: FileCategory,
}

impl DirEntryInfo {
    pub fn new(name: impl Into<String>, category: FileCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

/// Source of raw directory listings.
pub trait DirectoryLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// Lists the real filesystem via `read_dir` + `symlink_metadata`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let category = fs::symlink_metadata(entry.path())
                .map(|meta| FileCategory::from_file_type(meta.file_type()))
                .unwrap_or(FileCategory::Other);
            out.push(DirEntryInfo::new(
                entry.file_name().to_string_lossy().into_owned(),
                category,
            ));
        }
        Ok(out)
    }
}

/// Snapshot of one directory, recomputed only when the requested path
/// changes or after [`invalidate`](Directory::invalidate).
#[derive(Debug, Default)]
pub struct Directory {
    path: Option<PathBuf>,
    entries: Vec<DirEntryInfo>,
    stale: bool,
    warned: HashSet<PathBuf>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing of `dir`, refreshed through `lister` when needed.
    ///
    /// A read failure yields an empty listing and is logged once per path.
    pub fn refresh(&mut self, dir: &Path, lister: &dyn DirectoryLister) -> &[DirEntryInfo] {
        let hit = !self.stale && self.path.as_deref() == Some(dir);
        if !hit {
            self.entries = match lister.list(dir) {
                Ok(mut entries) => {
                    entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
                    entries
                }
                Err(err) => {
                    if self.warned.insert(dir.to_path_buf()) {
                        warn!(target: "complete.dir", path = %dir.display(), error = %err, "directory_read_failed");
                    }
                    Vec::new()
                }
            };
            self.path = Some(dir.to_path_buf());
            self.stale = false;
            trace!(target: "complete.dir", entries = self.entries.len(), "directory_refreshed");
        }
        &self.entries
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[DirEntryInfo] {
        &self.entries
    }

    pub fn category_of(&self, name: &str) -> Option<FileCategory> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.category)
    }
}
