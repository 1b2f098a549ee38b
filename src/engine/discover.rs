//! Input discovery: expand files and directories into WARC files.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{Error, Result};

/// File name patterns searched for under directory inputs
pub const WARC_PATTERNS: [&str; 2] = ["*.warc", "*.warc.gz"];

/// A discovered archive file and its size on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Expand `inputs` into archive files, preserving input order.
///
/// Files are taken as-is; directories are searched recursively and their
/// matches sorted by path. A missing input fails before anything is read.
pub fn discover_archives(inputs: &[PathBuf]) -> Result<Vec<ArchiveFile>> {
    let mut files = Vec::new();

    for input in inputs {
        let metadata = std::fs::metadata(input).map_err(|source| Error::Io {
            path: input.clone(),
            source,
        })?;

        if metadata.is_dir() {
            let mut found = find_in_dir(input)?;
            found.sort();
            for path in found {
                files.push(archive_file(path)?);
            }
        } else {
            files.push(ArchiveFile {
                path: input.clone(),
                size: metadata.len(),
            });
        }
    }

    Ok(files)
}

fn find_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let base = Pattern::escape(&dir.to_string_lossy());
    let mut found = Vec::new();

    for name in WARC_PATTERNS {
        let pattern = format!("{}/**/{}", base, name);
        let paths = glob::glob(&pattern).map_err(|e| Error::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        })?;

        for entry in paths {
            let path = entry.map_err(|e| Error::Io {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if path.is_file() {
                found.push(path);
            }
        }
    }

    Ok(found)
}

fn archive_file(path: PathBuf) -> Result<ArchiveFile> {
    let size = std::fs::metadata(&path)
        .map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?
        .len();
    Ok(ArchiveFile { path, size })
}

/// Total bytes across all discovered files
pub fn total_size(files: &[ArchiveFile]) -> u64 {
    files.iter().map(|f| f.size).sum()
}
