//! Append-only JSON-lines store
//!
//! One record per line. Inserts append, queries scan the whole file,
//! clear truncates it.

use super::SoundStore;
use crate::error::{Result, SoundboyError};
use crate::model::{SoundMetadata, SoundQuery};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sound store backed by a JSON-lines file
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    // Serializes writers so concurrent inserts never interleave lines
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open (or create) a store file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                SoundboyError::persistence(format!("cannot create {:?}: {}", parent, e))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SoundboyError::persistence(format!("cannot open {:?}: {}", path, e)))?;

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<SoundMetadata>> {
        let file = File::open(&self.path).map_err(|e| {
            SoundboyError::persistence(format!("cannot read {:?}: {}", self.path, e))
        })?;

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SoundMetadata>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!(
                        "Skipping malformed record at {:?}:{}: {}",
                        self.path,
                        index + 1,
                        e
                    );
                }
            }
        }
        Ok(records)
    }
}

impl SoundStore for JsonStore {
    fn insert(&self, record: &SoundMetadata) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SoundboyError::persistence("store lock poisoned"))?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| SoundboyError::persistence(format!("cannot open {:?}: {}", self.path, e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| SoundboyError::persistence(format!("write failed: {}", e)))?;

        Ok(())
    }

    fn query(&self, filter: &SoundQuery) -> Result<Vec<SoundMetadata>> {
        // Hold the writer lock so an append in progress is never read half-written
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SoundboyError::persistence("store lock poisoned"))?;

        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    fn clear(&self) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SoundboyError::persistence("store lock poisoned"))?;

        let removed = self.read_all()?.len();
        File::create(&self.path)
            .map_err(|e| SoundboyError::persistence(format!("cannot truncate {:?}: {}", self.path, e)))?;

        log::info!("Cleared {} records from {:?}", removed, self.path);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db/sounds.jsonl");

        {
            let store = JsonStore::open(&path).unwrap();
            store
                .insert(&SoundMetadata::for_file(Path::new("/a.mp3"), 1))
                .unwrap();
            store
                .insert(&SoundMetadata::for_file(Path::new("/c/d.flac"), 2))
                .unwrap();
        }

        let store = JsonStore::open(&path).unwrap();
        let all = store.query(&SoundQuery::all()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].filename, "/a.mp3");

        let flacs = store.query(&SoundQuery::all().with("format", "flac")).unwrap();
        assert_eq!(flacs.len(), 1);
    }

    #[test]
    fn test_clear_truncates() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path().join("sounds.jsonl")).unwrap();
        store
            .insert(&SoundMetadata::for_file(Path::new("/a.mp3"), 1))
            .unwrap();

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.query(&SoundQuery::all()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sounds.jsonl");
        let store = JsonStore::open(&path).unwrap();
        store
            .insert(&SoundMetadata::for_file(Path::new("/a.mp3"), 1))
            .unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(store.query(&SoundQuery::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_inserts() {
        use std::sync::Arc;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(dir.path().join("sounds.jsonl")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        let path = format!("/t{}/s{}.wav", i, j);
                        store
                            .insert(&SoundMetadata::for_file(Path::new(&path), 1))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.query(&SoundQuery::all()).unwrap().len(), 80);
    }

    #[test]
    fn test_query_during_inserts_sees_whole_records() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(dir.path().join("sounds.jsonl")).unwrap());
        let written = Arc::new(AtomicUsize::new(0));

        let writer = {
            let store = Arc::clone(&store);
            let written = Arc::clone(&written);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let path = format!("/loops/{:03}.wav", i);
                    store
                        .insert(&SoundMetadata::for_file(Path::new(&path), i))
                        .unwrap();
                    written.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let mut last = 0;
        while written.load(Ordering::SeqCst) < 200 {
            let before = written.load(Ordering::SeqCst);
            let seen = store.query(&SoundQuery::all()).unwrap().len();
            let after = written.load(Ordering::SeqCst);

            assert!(seen >= before && seen <= after + 1);
            assert!(seen >= last);
            last = seen;
        }

        writer.join().unwrap();
        assert_eq!(store.query(&SoundQuery::all()).unwrap().len(), 200);
    }
}
