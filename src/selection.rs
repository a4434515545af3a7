//! File selection: which local documents are eligible for conversion.
//!
//! The service only converts Word documents, and Office leaves lock files
//! (`~$report.docx`) and hidden shadow copies (`.report.docx`) next to the
//! real ones. Both share the extension, so the filter looks at the name
//! prefix as well as the suffix.

use crate::config::ConversionSettings;
use crate::error::ValidationError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions the service accepts, lowercase.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = [".docx", ".doc"];

/// Prefix Office uses for owner/lock files.
pub const LOCK_FILE_MARKER: &str = "~$";

/// Prefix of hidden files.
pub const HIDDEN_FILE_MARKER: &str = ".";

/// A local file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Bare file name, e.g. `report.docx`.
    pub name: String,
    /// Size in bytes at selection time.
    pub size: u64,
    /// Where the bytes are read from at upload time.
    pub path: PathBuf,
    /// Path relative to the selected folder, forward-slash normalised.
    /// None for individually picked files.
    pub relative_path: Option<String>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            path: path.into(),
            relative_path: None,
        }
    }

    /// Stat a path on disk and build a selection entry from it.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        Ok(Self::new(name, meta.len(), path))
    }

    pub fn is_accepted(&self) -> bool {
        is_accepted_name(&self.name)
    }
}

/// True if `name` is a Word document and not a lock or hidden file.
pub fn is_accepted_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        && !name.starts_with(LOCK_FILE_MARKER)
        && !name.starts_with(HIDDEN_FILE_MARKER)
}

/// Keep only accepted files, preserving order.
pub fn filter_accepted(files: &[SelectedFile]) -> Vec<SelectedFile> {
    files.iter().filter(|f| f.is_accepted()).cloned().collect()
}

/// Start guard: at least one accepted file and valid settings.
pub fn can_start(files: &[SelectedFile], settings: &ConversionSettings) -> bool {
    check_start(files, settings).is_ok()
}

/// Like [`can_start`] but returns the accepted files or the reason for refusal.
pub fn check_start(
    files: &[SelectedFile],
    settings: &ConversionSettings,
) -> Result<Vec<SelectedFile>, ValidationError> {
    let accepted = filter_accepted(files);
    if accepted.is_empty() {
        return Err(ValidationError::NoAcceptedFiles);
    }
    settings.validate()?;
    Ok(accepted)
}

/// The user's current pick of documents.
///
/// Picking individual files appends to the selection; picking a folder
/// replaces it. Both paths drop anything the filter rejects.
#[derive(Debug, Default, Clone)]
pub struct FileSelection {
    files: Vec<SelectedFile>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Append the accepted subset of `files`. Returns how many were added.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = SelectedFile>) -> usize {
        let before = self.files.len();
        self.files.extend(files.into_iter().filter(SelectedFile::is_accepted));
        let added = self.files.len() - before;
        debug!("Added {} documents ({} selected)", added, self.files.len());
        added
    }

    /// Replace the selection with every accepted document under `root`.
    /// Returns the number of documents found.
    ///
    /// Symbolic links are not followed, so each document is found once.
    pub fn load_folder(&mut self, root: impl AsRef<Path>) -> io::Result<usize> {
        let root = root.as_ref();
        let paths = collect_document_paths(root)?;

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let mut file = SelectedFile::from_path(&path)?;
            file.relative_path = path.strip_prefix(root).ok().map(normalize_path);
            files.push(file);
        }

        info!(
            "Loaded {} Word documents from folder {}",
            files.len(),
            root.display()
        );
        self.files = files;
        Ok(self.files.len())
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Accepted document paths under `root`, depth-first in file-name order.
fn collect_document_paths(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_accepted_name) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn normalize_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
