use super::SoundStore;
use crate::error::{Result, SoundboyError};
use crate::model::{SoundMetadata, SoundQuery};
use std::sync::{Mutex, MutexGuard};

/// In-memory store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<SoundMetadata>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<SoundMetadata>>> {
        self.records
            .lock()
            .map_err(|_| SoundboyError::persistence("memory store lock poisoned"))
    }
}

impl SoundStore for MemoryStore {
    fn insert(&self, record: &SoundMetadata) -> Result<()> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    fn query(&self, filter: &SoundQuery) -> Result<Vec<SoundMetadata>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<usize> {
        let mut records = self.lock()?;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_insert_query_clear() {
        let store = MemoryStore::new();
        store
            .insert(&SoundMetadata::for_file(Path::new("/a.mp3"), 1))
            .unwrap();
        store
            .insert(&SoundMetadata::for_file(Path::new("/b.wav"), 2))
            .unwrap();

        assert_eq!(store.query(&SoundQuery::all()).unwrap().len(), 2);

        let wavs = store
            .query(&SoundQuery::all().with("format", "wav"))
            .unwrap();
        assert_eq!(wavs.len(), 1);
        assert_eq!(wavs[0].filename, "/b.wav");

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_insert_is_kept() {
        let store = MemoryStore::new();
        let record = SoundMetadata::for_file(Path::new("/a.mp3"), 1);
        store.insert(&record).unwrap();
        store.insert(&record).unwrap();
        assert_eq!(store.len(), 2);
    }
}
