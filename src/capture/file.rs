//! File saving functionality for screenshots and exports.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for file saving.
#[derive(Debug, Clone)]
pub struct FileSaveConfig {
    /// Directory to save screenshots to.
    pub save_directory: PathBuf,
    /// Text before the timestamp in generated names.
    pub filename_prefix: String,
}

impl Default for FileSaveConfig {
    fn default() -> Self {
        Self {
            save_directory: dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Pagesnap"),
            filename_prefix: "screenshot".to_string(),
        }
    }
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced by `-`, so it is safe in
/// file names on every platform.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
/// assert_eq!(pagesnap::capture::file::timestamp_label(at), "2024-05-01T12-30-45-000Z");
/// ```
pub fn timestamp_label(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Generate a filename of the form `<prefix>_<timestamp>.<extension>`.
pub fn generate_filename(prefix: &str, extension: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.{}", prefix, timestamp_label(now), extension)
}

/// Ensure the save directory exists, creating it if necessary.
///
/// # Returns
/// The canonicalized path to the directory
pub fn ensure_directory_exists(directory: &Path) -> io::Result<PathBuf> {
    if !directory.exists() {
        log::info!("Creating screenshot directory: {}", directory.display());
        fs::create_dir_all(directory)?;
    }

    let canonical = directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf());

    Ok(canonical)
}

/// Picks `name` inside `directory`, adding `-1`, `-2`, ... before the
/// extension if a file with that name already exists.
fn unique_path(directory: &Path, name: &str) -> PathBuf {
    let candidate = directory.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, extension) = name.rsplit_once('.').unwrap_or((name, ""));
    (1..)
        .map(|n| {
            if extension.is_empty() {
                directory.join(format!("{stem}-{n}"))
            } else {
                directory.join(format!("{stem}-{n}.{extension}"))
            }
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Save encoded image data under a generated name.
///
/// # Arguments
/// * `data` - Encoded file contents
/// * `extension` - File extension without the dot (e.g. "png")
/// * `config` - File save configuration
///
/// # Returns
/// Path to the saved file
pub fn save_screenshot(data: &[u8], extension: &str, config: &FileSaveConfig) -> io::Result<PathBuf> {
    let directory = ensure_directory_exists(&config.save_directory)?;

    let filename = generate_filename(&config.filename_prefix, extension, Utc::now());
    let file_path = unique_path(&directory, &filename);

    log::info!(
        "Saving screenshot to: {} ({} bytes)",
        file_path.display(),
        data.len()
    );

    fs::write(&file_path, data)?;

    let written_size = fs::metadata(&file_path)?.len();
    log::debug!("File written: {} bytes", written_size);

    // Set permissions to user read/write only
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&file_path, Permissions::from_mode(0o600))?;
    }

    log::info!("Screenshot saved successfully: {}", file_path.display());

    Ok(file_path)
}

/// Expand tilde (~) in path strings.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_filename() {
        let at = Utc
            .with_ymd_and_hms(2023, 11, 2, 8, 5, 9)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(42))
            .unwrap();
        let filename = generate_filename("screenshot", "png", at);
        assert_eq!(filename, "screenshot_2023-11-02T08-05-09-042Z.png");
        assert!(!filename.contains(':'));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/Pictures");
        assert!(!expanded.to_string_lossy().starts_with("~"));

        let no_tilde = expand_tilde("/absolute/path");
        assert_eq!(no_tilde, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_default_config() {
        let config = FileSaveConfig::default();
        assert_eq!(config.filename_prefix, "screenshot");
        assert!(config.save_directory.to_string_lossy().contains("Pagesnap"));
    }

    #[test]
    fn save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileSaveConfig {
            save_directory: dir.path().join("shots"),
            filename_prefix: "shot".to_string(),
        };
        let first = save_screenshot(b"one", "png", &config).unwrap();
        let second = unique_path(first.parent().unwrap(), first.file_name().unwrap().to_str().unwrap());
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-1.png"));
        assert_eq!(fs::read(&first).unwrap(), b"one");
    }
}
