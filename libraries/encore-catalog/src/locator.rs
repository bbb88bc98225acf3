//! Locator construction and filename heuristics.

use url::Url;

/// Check that a base URL can carry `<folder>/<filename>` segments
pub fn validate_base(base: &str) -> Result<Url, String> {
    let url = Url::parse(base.trim()).map_err(|e| format!("{base}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{base}: scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(format!("{base}: cannot be a base"));
    }
    Ok(url)
}

/// Build `<base>/<folder>/<filename>` with every segment percent-encoded
///
/// `filename` may contain `/`-separated subdirectories. Empty, `.` and `..`
/// segments are rejected rather than normalized.
pub fn build_locator(base: &Url, folder: &str, filename: &str) -> Result<Url, String> {
    let folder = folder.trim();
    if folder.is_empty() {
        return Err("empty show folder".to_string());
    }
    check_segment(folder)?;

    if filename.trim().is_empty() {
        return Err("empty filename".to_string());
    }
    let segments: Vec<&str> = filename.split('/').collect();
    for segment in &segments {
        check_segment(segment)?;
    }

    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| "base cannot carry path segments".to_string())?;
        path.pop_if_empty().push(folder);
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// Parse an explicit per-track locator
pub fn parse_override(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("invalid locator {raw:?}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("locator {raw:?} has no host"));
    }
    Ok(url)
}

fn check_segment(segment: &str) -> Result<(), String> {
    match segment {
        "" => Err("empty path segment".to_string()),
        "." | ".." => Err(format!("relative path segment {segment:?}")),
        s if s.chars().any(char::is_control) => Err("control character in path".to_string()),
        _ => Ok(()),
    }
}

/// Guess whether a file holds a whole set rather than one song
///
/// Per-song files carry a track or disc marker: `t01`, `d1t01`, `track3`,
/// or a leading track number (`01 Jack Straw.mp3`). A file with none of
/// these is probably a long single recording.
pub fn is_likely_large_single_file(filename: &str) -> bool {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let stem = stem.to_ascii_lowercase();
    !has_track_marker(&stem)
}

fn has_track_marker(stem: &str) -> bool {
    let bytes = stem.as_bytes();

    if bytes.first().is_some_and(u8::is_ascii_digit) {
        return true;
    }
    if stem
        .match_indices("track")
        .any(|(at, _)| bytes.get(at + 5).is_some_and(u8::is_ascii_digit))
    {
        return true;
    }

    for (i, &b) in bytes.iter().enumerate() {
        let next_is_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if !next_is_digit {
            continue;
        }
        // `t01` at a word boundary or after a disc number (`d2t01`)
        if b == b't' && (i == 0 || !bytes[i - 1].is_ascii_alphabetic()) {
            return true;
        }
        // `d2t`, `d12t`
        if b == b'd' {
            let digits_end = bytes[i + 1..]
                .iter()
                .position(|c| !c.is_ascii_digit())
                .map_or(bytes.len(), |p| i + 1 + p);
            if bytes.get(digits_end) == Some(&b't') {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        validate_base("https://archive.org/download").unwrap()
    }

    #[test]
    fn percent_encodes_filename() {
        let url = build_locator(&base(), "jg1976-07-18", "01 Sugaree #2.mp3").unwrap();
        assert_eq!(
            url.as_str(),
            "https://archive.org/download/jg1976-07-18/01%20Sugaree%20%232.mp3"
        );
    }

    #[test]
    fn keeps_subdirectories_as_segments() {
        let url = build_locator(&base(), "show", "disc1/t01.mp3").unwrap();
        assert_eq!(url.path(), "/download/show/disc1/t01.mp3");
    }

    #[test]
    fn trailing_slash_base_does_not_double_up() {
        let base = validate_base("https://archive.org/download/").unwrap();
        let url = build_locator(&base, "show", "t01.mp3").unwrap();
        assert_eq!(url.path(), "/download/show/t01.mp3");
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(build_locator(&base(), "show", "").is_err());
        assert!(build_locator(&base(), "show", "..").is_err());
        assert!(build_locator(&base(), "show", "a//b.mp3").is_err());
        assert!(build_locator(&base(), "", "t01.mp3").is_err());
    }

    #[test]
    fn rejects_unusable_bases() {
        assert!(validate_base("ftp://archive.org/download").is_err());
        assert!(validate_base("mailto:someone@example.org").is_err());
        assert!(validate_base("not a url").is_err());
    }

    #[test]
    fn override_requires_http_host() {
        assert!(parse_override("https://cdn.example.org/a.mp3").is_ok());
        assert!(parse_override("file:///tmp/a.mp3").is_err());
        assert!(parse_override("https://").is_err());
    }

    #[test]
    fn track_markers_mean_per_song_files() {
        for name in [
            "gd77-05-08d2t01.mp3",
            "jgb1976-07-18t03.mp3",
            "track7.mp3",
            "01 Sugaree.mp3",
            "gd1977-05-08 t12.mp3",
        ] {
            assert!(!is_likely_large_single_file(name), "{name}");
        }
    }

    #[test]
    fn unmarked_files_are_large_single_files() {
        for name in ["gd1977-05-08set1.mp3", "jgb-1976-complete.mp3", "sbd.mp3"] {
            assert!(is_likely_large_single_file(name), "{name}");
        }
    }
}
