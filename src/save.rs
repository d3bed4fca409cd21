use crate::error::ReplError;
use std::path::{Path, PathBuf};

// Characters no file name may contain on the platforms we run on.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', '"', '|', '?', '*'];

/// Write every submission in `history` to `filename`, one after another.
///
/// Relative names are resolved against `base_dir` when given. Returns the
/// path written.
pub fn save_session(history: &[String], filename: &str, base_dir: Option<&Path>) -> Result<PathBuf, ReplError> {
    let name = filename.trim();
    if name.is_empty() {
        return Err(ReplError::MissingFilename);
    }
    if name.chars().any(|c| INVALID_FILENAME_CHARS.contains(&c) || c.is_control()) {
        return Err(ReplError::InvalidFilename { name: name.to_string() });
    }

    let path = match base_dir {
        Some(base) if Path::new(name).is_relative() => base.join(name),
        _ => PathBuf::from(name),
    };

    let mut contents = String::new();
    for entry in history {
        contents.push_str(entry);
        if !entry.ends_with('\n') {
            contents.push('\n');
        }
    }

    std::fs::write(&path, contents).map_err(|e| ReplError::SaveFailed { reason: e.to_string() })?;
    log::debug!("Saved {} submissions to {}", history.len(), path.display());
    Ok(path)
}
