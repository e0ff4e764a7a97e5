//! The [`FileListing`] collaborator, which finds input files available
//! to a front end, e.g. measurement tables and feature files in a data
//! directory.
//!
//! The comparison core never scans directories itself; callers inject
//! whatever listing suits them.

use std::path::{Path, PathBuf};

use crate::error::PimmsError;

use super::file::get_base_extension;

/// Lists the input files with a given extension.
pub trait FileListing {
    fn list_available(&self, extension: &str) -> Result<Vec<PathBuf>, PimmsError>;
}

/// A [`FileListing`] over the files in a single directory (not recursive).
#[derive(Clone, Debug)]
pub struct DirectoryListing {
    root: PathBuf,
}

impl DirectoryListing {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileListing for DirectoryListing {
    /// List files whose base extension (ignoring `.gz`/`.bgz`) matches
    /// `extension`, sorted by path.
    fn list_available(&self, extension: &str) -> Result<Vec<PathBuf>, PimmsError> {
        let extension = extension.trim_start_matches('.');
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if get_base_extension(&path).map_or(false, |ext| ext == extension) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}
