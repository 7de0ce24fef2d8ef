use crate::directory::{DirEntryInfo, DirectoryLister, FileCategory};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Executable names reachable through the search path.
///
/// Built on first use and kept for the rest of the session; the first
/// directory providing a name wins.
#[derive(Debug, Clone)]
pub struct CommandIndex {
    dirs: Vec<PathBuf>,
    names: Option<Vec<DirEntryInfo>>,
}

impl CommandIndex {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs, names: None }
    }

    /// Index over the directories of `$PATH`.
    pub fn from_env() -> Self {
        let dirs = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        Self::new(dirs)
    }

    pub fn is_built(&self) -> bool {
        self.names.is_some()
    }

    /// Sorted names, building the index on first call.
    pub fn names(&mut self, lister: &dyn DirectoryLister) -> &[DirEntryInfo] {
        let dirs = &self.dirs;
        self.names.get_or_insert_with(|| {
            let mut found: BTreeMap<String, FileCategory> = BTreeMap::new();
            for dir in dirs {
                match lister.list(dir) {
                    Ok(entries) => {
                        for e in entries {
                            if matches!(e.category, FileCategory::Regular | FileCategory::Symlink) {
                                found.entry(e.name).or_insert(e.category);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(target: "complete.dir", path = %dir.display(), error = %err, "search_path_unreadable");
                    }
                }
            }
            debug!(target: "complete.path", commands = found.len(), dirs = dirs.len(), "command_index_built");
            found
                .into_iter()
                .map(|(name, category)| DirEntryInfo::new(name, category))
                .collect()
        })
    }
}
