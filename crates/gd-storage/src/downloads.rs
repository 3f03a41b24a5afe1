use gd_core::BrowserError;
use gd_core::BrowserResult;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// File name for saved content: the sanitized URL basename, with `extension`
/// appended when the name does not already end with it.
pub fn download_file_name(basename: &str, extension: Option<&str>) -> String {
    let mut name = String::new();
    for ch in basename.trim().chars() {
        if ch.is_alphanumeric() || ch == '.' || ch == '-' || ch == '_' || ch == ' ' {
            name.push(ch);
        } else {
            name.push('_');
        }
    }
    let trimmed = name.trim_matches(|ch| ch == '.' || ch == ' ');
    let mut name = if trimmed.is_empty() {
        "download".to_owned()
    } else {
        trimmed.to_owned()
    };

    if let Some(extension) = extension.filter(|ext| !ext.is_empty()) {
        let suffix = format!(".{extension}");
        if !name.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()) {
            name.push_str(&suffix);
        }
    }
    name
}

/// Writes `bytes` into `dir` without overwriting existing files.
pub fn save_to_downloads(dir: &Path, name: &str, bytes: &[u8]) -> BrowserResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|error| {
        BrowserError::io(
            "storage.download_dir_create_failed",
            format!("failed to create `{}`", dir.display()),
            &error,
        )
    })?;

    let path = unused_path(dir, name)?;
    fs::write(&path, bytes).map_err(|error| {
        BrowserError::io(
            "storage.download_write_failed",
            format!("failed to write `{}`", path.display()),
            &error,
        )
    })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved download");
    Ok(path)
}

fn unused_path(dir: &Path, name: &str) -> BrowserResult<PathBuf> {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let numbered = match extension {
            Some(extension) => format!("{stem} ({attempt}).{extension}"),
            None => format!("{stem} ({attempt})"),
        };
        let candidate = dir.join(numbered);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(BrowserError::new(
        "storage.download_name_exhausted",
        format!("no free file name for `{name}` in `{}`", dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::download_file_name;
    use super::save_to_downloads;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_downloads_dir() -> std::path::PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|value| value.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("gemdust-downloads-test-{stamp}"))
    }

    #[test]
    fn names_get_sanitized_and_extended() {
        assert_eq!(download_file_name("photo", Some("png")), "photo.png");
        assert_eq!(download_file_name("photo.PNG", Some("png")), "photo.PNG");
        assert_eq!(download_file_name("a/b:c", None), "a_b_c");
        assert_eq!(download_file_name("", Some("gmi")), "download.gmi");
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = temp_downloads_dir();
        let first = save_to_downloads(&dir, "page.gmi", b"one");
        assert!(first.is_ok());
        let second = save_to_downloads(&dir, "page.gmi", b"two");
        assert!(second.is_ok());

        let second = second.unwrap_or_else(|_| unreachable!());
        assert_eq!(
            second.file_name().and_then(|name| name.to_str()),
            Some("page (1).gmi")
        );
        assert_eq!(std::fs::read(&second).ok(), Some(b"two".to_vec()));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn write_failure_keeps_system_error_text() {
        let dir = temp_downloads_dir();
        assert!(std::fs::create_dir_all(&dir).is_ok());
        let blocker = dir.join("blocker");
        assert!(std::fs::write(&blocker, b"file").is_ok());

        let result = save_to_downloads(&blocker, "x.bin", b"data");
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "storage.download_dir_create_failed");
            assert!(error.message.contains("blocker"));
        }

        let _ = std::fs::remove_dir_all(dir);
    }
}
