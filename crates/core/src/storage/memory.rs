use dashmap::DashSet;

use crate::dht::FileId;

/// Set of file ids stored on this peer. Entries are never evicted.
#[derive(Debug, Default)]
pub struct ContentStore {
    files: DashSet<FileId>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            files: DashSet::default(),
        }
    }

    /// Returns false if the file was already held.
    pub fn insert(&self, file: FileId) -> bool {
        self.files.insert(file)
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.files.contains(&file)
    }

    /// Held file ids in ascending order.
    pub fn list(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.files.iter().map(|f| *f).collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
