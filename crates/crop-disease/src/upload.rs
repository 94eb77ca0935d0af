use crate::error::UploadError;
use std::path::{Path, PathBuf};

/// Reduces a client-supplied filename to `[A-Za-z0-9._-]`, never escaping the upload directory.
///
/// Whitespace and path separators become `_`, non-ASCII characters are dropped, and leading or
/// trailing dots and underscores are stripped. Returns `None` if nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
	let spaced: String = name
		.chars()
		.filter(char::is_ascii)
		.map(|c| if c == '/' || c == '\\' { ' ' } else { c })
		.collect();

	let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
	let cleaned: String = joined
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
		.collect();

	let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
	if trimmed.is_empty() {
		None
	} else {
		Some(trimmed.to_string())
	}
}

/// Writes the upload into `dir` (created on demand) and returns the saved path.
pub async fn save(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, UploadError> {
	let name = sanitize_filename(file_name).ok_or_else(|| UploadError::InvalidFilename(file_name.to_string()))?;

	tokio::fs::create_dir_all(dir).await?;
	let path = dir.join(name);
	tokio::fs::write(&path, bytes).await?;

	Ok(path)
}
