//! Shared plumbing of the echomark command-line tools

pub mod output;

use anyhow::{Context, Result};
use echomark_core::audio::is_supported_audio;
use echomark_core::EchomarkSettings;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Initialize the logger.
///
/// Quiet by default so stdout stays clean JSON; `--verbose` shows info
/// logs on stderr. `RUST_LOG` still applies on top.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load settings from `--config`, `./echomark.toml` or defaults
pub fn load_settings(config: Option<&str>) -> Result<EchomarkSettings> {
    let settings = EchomarkSettings::load_or_default(config.map(Path::new))
        .with_context(|| format!("Failed to load settings from {}", config.unwrap_or("defaults")))?;
    log::info!("Index path: {}", settings.index.path);
    Ok(settings)
}

/// Audio files below `dir`, recursively, in sorted order. Symlinks are not
/// followed.
pub fn scan_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Audio directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_supported_audio(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => log::warn!("Skipping unreadable entry below {}: {}", dir.display(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Track title for an audio file: its path relative to the scanned root
pub fn track_title(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_audio_recursively_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("live");
        std::fs::create_dir(&nested).unwrap();
        for name in ["b.mp3", "a.WAV", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::write(nested.join("c.flac"), b"").unwrap();

        let files = scan_audio_files(dir.path()).unwrap();
        let titles: Vec<_> = files.iter().map(|f| track_title(dir.path(), f)).collect();
        assert_eq!(
            titles,
            vec![
                "a.WAV".to_string(),
                "b.mp3".to_string(),
                Path::new("live").join("c.flac").to_string_lossy().into_owned(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("album");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("song.wav"), b"").unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();
        std::os::unix::fs::symlink(nested.join("song.wav"), dir.path().join("alias.wav"))
            .unwrap();

        let files = scan_audio_files(dir.path()).unwrap();
        assert_eq!(files, vec![nested.join("song.wav")]);
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_audio_files(&dir.path().join("absent")).is_err());
    }
}
