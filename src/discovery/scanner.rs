//! Recursive sound file scanner

use crate::error::{Result, SoundboyError};
use crate::model::SoundFile;
use std::path::Path;
use walkdir::WalkDir;

/// Extensions picked up by the scanner (compared case-insensitively)
pub const SOUND_EXTENSIONS: [&str; 4] = ["mp3", "wav", "aif", "flac"];

/// Recursively find all sound files under `root`
///
/// An empty tree yields an empty list. Only a missing or unreadable root is
/// an error; unreadable entries below it are skipped with a warning.
pub fn enumerate(root: &Path) -> Result<Vec<SoundFile>> {
    let metadata = std::fs::metadata(root).map_err(|e| SoundboyError::Enumeration {
        root: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(SoundboyError::Enumeration {
            root: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    // Surface permission errors on the root itself rather than
    // returning an empty batch
    std::fs::read_dir(root).map_err(|e| SoundboyError::Enumeration {
        root: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_sound_file(entry.path()) {
            log::debug!("Discovered: {:?}", entry.path());
            files.push(SoundFile::new(entry.path()));
        }
    }

    log::info!("Discovered {} sound files under {:?}", files.len(), root);
    Ok(files)
}

/// Check whether a path has one of the supported extensions
pub fn is_sound_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SOUND_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_sound_file() {
        assert!(is_sound_file(Path::new("a.mp3")));
        assert!(is_sound_file(Path::new("b.WAV")));
        assert!(is_sound_file(Path::new("dir/c.aif")));
        assert!(is_sound_file(Path::new("d.flac")));
        assert!(!is_sound_file(Path::new("e.ogg")));
        assert!(!is_sound_file(Path::new("notes.txt")));
        assert!(!is_sound_file(Path::new("mp3")));
    }

    #[test]
    fn test_enumerate_recursive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.mp3"), b"a").unwrap();
        fs::write(dir.path().join("b.wav"), b"b").unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("c")).unwrap();
        fs::write(dir.path().join("c/d.flac"), b"d").unwrap();

        let mut names: Vec<String> = enumerate(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.mp3", "b.wav", "d.flac"]);
    }

    #[test]
    fn test_enumerate_empty_folder() {
        let dir = TempDir::new().unwrap();
        assert!(enumerate(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_missing_root() {
        let err = enumerate(Path::new("/nonexistent/soundboy/root")).unwrap_err();
        assert!(matches!(err, SoundboyError::Enumeration { .. }));
    }

    #[test]
    fn test_enumerate_file_root_is_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mp3");
        fs::write(&file, b"a").unwrap();

        assert!(matches!(
            enumerate(&file),
            Err(SoundboyError::Enumeration { .. })
        ));
    }
}
