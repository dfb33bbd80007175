//! Data directory layout.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GUTACHTOMAT_DATA_DIR";

/// Resolve the data directory.
///
/// Priority:
/// 1. `GUTACHTOMAT_DATA_DIR` environment variable
/// 2. `~/.gutachtomat`
/// 3. `.gutachtomat` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".gutachtomat");
    }

    PathBuf::from(".gutachtomat")
}

/// Location of the local encryption key: `{data_dir}/draft.key`.
pub fn key_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("draft.key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_data_dir_is_never_empty() {
        let dir = resolve_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn key_file_lives_in_data_dir() {
        let path = key_file_path(Path::new("/srv/gutachtomat"));
        assert_eq!(path, PathBuf::from("/srv/gutachtomat/draft.key"));
    }
}
