//! Input file discovery.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::error::{StatsError, StatsResult};

/// File name pattern for book files.
pub const BOOK_FILE_PATTERN: &str = "*.json";

/// List regular files directly inside `dir` whose name matches `*.json` (case-sensitive).
///
/// Subdirectories are not descended. The result is sorted by path so that task submission
/// order is reproducible.
pub fn discover_json_files(dir: impl AsRef<Path>) -> StatsResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(StatsError::Directory {
            path: dir.to_path_buf(),
        });
    }

    let pattern = Pattern::new(BOOK_FILE_PATTERN).expect("book file pattern is valid");
    let opts = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => StatsError::Io(io),
            None => StatsError::Directory {
                path: dir.to_path_buf(),
            },
        })?;
        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.matches_with(name, opts));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::discover_json_files;
    use crate::error::StatsError;
    use std::fs;

    #[test]
    fn finds_only_top_level_json_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "[]").unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("upper.JSON"), "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("deep.json"), "[]").unwrap();

        let files = discover_json_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_json_files(&missing),
            Err(StatsError::Directory { .. })
        ));

        let file = dir.path().join("file.json");
        fs::write(&file, "{}").unwrap();
        assert!(matches!(
            discover_json_files(&file),
            Err(StatsError::Directory { .. })
        ));
    }
}
