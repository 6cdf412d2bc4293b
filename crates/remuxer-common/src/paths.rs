//! Path utilities for detecting remuxable inputs and naming outputs.
//!
//! Inputs are recognised by extension. Outputs are written beside their input
//! with the same stem and a new extension; when that name is taken, a `(N)`
//! suffix is appended using the smallest free `N`.

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// List of container extensions accepted as remux inputs.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "mov", "ts", "m2ts", "avi", "webm", "flv",
];

/// Default extension for remuxed outputs.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "mp4";

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use remuxer_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("recording.mkv")));
/// assert!(is_video_file(Path::new("/path/to/capture.TS")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a path's extension is one of `extensions` (case-insensitive).
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Pick an output path beside `input` that does not exist on disk yet.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use remuxer_common::paths::output_path_for;
///
/// let output = output_path_for(Path::new("/videos/capture.mkv"), "mp4")?;
/// // "/videos/capture.mp4", or "/videos/capture(1).mp4" if that exists
/// # Ok::<(), remuxer_common::Error>(())
/// ```
pub fn output_path_for(input: &Path, extension: &str) -> Result<PathBuf> {
    output_path_with(input, extension, |candidate| candidate.exists())
}

/// Pick an output path beside `input`, asking `taken` whether a candidate is
/// already in use.
///
/// The candidate sequence is `stem.ext`, `stem(1).ext`, `stem(2).ext`, ...
pub fn output_path_with<F>(input: &Path, extension: &str, mut taken: F) -> Result<PathBuf>
where
    F: FnMut(&Path) -> bool,
{
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::invalid_path(input))?;
    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    let first = parent.join(suffixed(stem.to_os_string(), None, extension));
    if !taken(&first) {
        return Ok(first);
    }

    for n in 1..=u32::MAX {
        let candidate = parent.join(suffixed(stem.to_os_string(), Some(n), extension));
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(Error::NameExhausted {
        stem: parent.join(stem),
    })
}

fn suffixed(mut name: OsString, n: Option<u32>, extension: &str) -> OsString {
    if let Some(n) = n {
        name.push(format!("({n})"));
    }
    name.push(".");
    name.push(extension);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("movie.mkv")));
        assert!(is_video_file(Path::new("movie.mp4")));
        assert!(is_video_file(Path::new("movie.m2ts")));
        assert!(is_video_file(Path::new("movie.ts")));
        assert!(is_video_file(Path::new("movie.mov")));

        // Case insensitive
        assert!(is_video_file(Path::new("movie.MKV")));
        assert!(is_video_file(Path::new("movie.Mp4")));

        // Not video files
        assert!(!is_video_file(Path::new("subtitle.srt")));
        assert!(!is_video_file(Path::new("image.jpg")));
        assert!(!is_video_file(Path::new("no_extension")));
    }

    #[test]
    fn test_has_extension_custom_list() {
        let exts = vec!["ts".to_string()];
        assert!(has_extension(Path::new("a.TS"), &exts));
        assert!(!has_extension(Path::new("a.mkv"), &exts));
    }

    #[test]
    fn test_output_path_free() {
        let out = output_path_with(Path::new("/videos/capture.mkv"), "mp4", |_| false).unwrap();
        assert_eq!(out, PathBuf::from("/videos/capture.mp4"));
    }

    #[test]
    fn test_output_path_without_extension() {
        let out = output_path_with(Path::new("capture"), "mp4", |_| false).unwrap();
        assert_eq!(out, PathBuf::from("capture.mp4"));
    }

    #[test]
    fn test_output_path_collisions() {
        let taken: HashSet<PathBuf> = [
            PathBuf::from("/v/clip.mp4"),
            PathBuf::from("/v/clip(1).mp4"),
            PathBuf::from("/v/clip(2).mp4"),
        ]
        .into_iter()
        .collect();

        let out = output_path_with(Path::new("/v/clip.ts"), "mp4", |p| taken.contains(p)).unwrap();
        assert_eq!(out, PathBuf::from("/v/clip(3).mp4"));
    }

    #[test]
    fn test_output_path_only_strips_last_extension() {
        let out = output_path_with(Path::new("/v/show.s01.mkv"), "mp4", |_| false).unwrap();
        assert_eq!(out, PathBuf::from("/v/show.s01.mp4"));
    }

    #[test]
    fn test_output_path_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"").unwrap();

        // The input itself occupies clip.mp4
        let out = output_path_for(&input, "mp4").unwrap();
        assert_eq!(out, dir.path().join("clip(1).mp4"));
    }

    #[test]
    fn test_output_path_rejects_root() {
        assert!(matches!(
            output_path_with(Path::new("/"), "mp4", |_| false),
            Err(Error::InvalidPath { .. })
        ));
    }
}
