//! Track discovery under a dataset root laid out as `<root>/<a>/<b>/<track>`.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::audio::transcode::{COMPRESSED_EXTENSION, WAVEFORM_EXTENSION};
use crate::error::{Error, Result};

/// Files exactly two directory levels below `root` with the given extension
/// (ASCII case-insensitive), sorted by path. Symlinks are followed; entries
/// that cannot be read are logged and skipped.
pub fn find_tracks(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "dataset root {} is not a directory",
            root.display()
        )));
    }

    let mut tracks = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            tracks.push(entry.into_path());
        }
    }
    Ok(tracks)
}

pub fn compressed_tracks(root: &Path) -> Result<Vec<PathBuf>> {
    find_tracks(root, COMPRESSED_EXTENSION)
}

pub fn waveform_tracks(root: &Path) -> Result<Vec<PathBuf>> {
    find_tracks(root, WAVEFORM_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn only_second_level_tracks_are_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("rock/album1")).unwrap();
        fs::create_dir_all(root.join("jazz/album2/extra")).unwrap();

        fs::write(root.join("top.mp3"), b"").unwrap();
        fs::write(root.join("rock/shallow.mp3"), b"").unwrap();
        fs::write(root.join("rock/album1/b.mp3"), b"").unwrap();
        fs::write(root.join("rock/album1/a.MP3"), b"").unwrap();
        fs::write(root.join("rock/album1/a.wav"), b"").unwrap();
        fs::write(root.join("jazz/album2/c.mp3"), b"").unwrap();
        fs::write(root.join("jazz/album2/extra/deep.mp3"), b"").unwrap();

        let mp3s = compressed_tracks(root).unwrap();
        assert_eq!(
            mp3s,
            vec![
                root.join("jazz/album2/c.mp3"),
                root.join("rock/album1/a.MP3"),
                root.join("rock/album1/b.mp3"),
            ]
        );
        assert_eq!(waveform_tracks(root).unwrap(), vec![root.join("rock/album1/a.wav")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_tracks_and_albums_are_found() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let root = dir.path().join("data");
        fs::create_dir_all(store.join("album")).unwrap();
        fs::create_dir_all(root.join("rock/album1")).unwrap();
        fs::create_dir_all(root.join("jazz")).unwrap();

        fs::write(store.join("linked.mp3"), b"").unwrap();
        fs::write(store.join("album/c.mp3"), b"").unwrap();
        symlink(store.join("linked.mp3"), root.join("rock/album1/a.mp3")).unwrap();
        symlink(store.join("album"), root.join("jazz/album2")).unwrap();

        assert_eq!(
            compressed_tracks(&root).unwrap(),
            vec![root.join("jazz/album2/c.mp3"), root.join("rock/album1/a.mp3")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn broken_entries_are_skipped() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("rock/album1")).unwrap();
        fs::create_dir_all(root.join("jazz")).unwrap();

        fs::write(root.join("rock/album1/a.mp3"), b"").unwrap();
        symlink(root.join("missing.mp3"), root.join("rock/album1/b.mp3")).unwrap();
        symlink(root.join("missing-dir"), root.join("jazz/album2")).unwrap();

        assert_eq!(compressed_tracks(root).unwrap(), vec![root.join("rock/album1/a.mp3")]);
    }

    #[test]
    fn missing_root_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = compressed_tracks(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
