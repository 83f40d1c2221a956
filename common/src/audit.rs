//! Directory audit: find uncompressed files and check them against size thresholds
//!
//! The walk visits every entry below (and including) the root in lexicographic order of file
//! names, without following symbolic links. Regular files whose extension is tracked become
//! [`FileRecord`]s. The first error aborts the audit and nothing collected so far is returned.
//!
//! # Examples
//!
//! ```no_run
//! use common::audit::{audit, AuditEvent};
//! use common::config::AuditSettings;
//!
//! let result = common::audit::audit_with(
//!     std::path::Path::new("/data/project"),
//!     &AuditSettings::default(),
//!     |event| {
//!         if let AuditEvent::LargeFile(record) = event {
//!             println!("{} is large", record.path.display());
//!         }
//!     },
//! )
//! .unwrap();
//! assert_eq!(result, audit(std::path::Path::new("/data/project"), &AuditSettings::default()).unwrap());
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::config::{AuditSettings, ExtensionMatch};
use crate::size::format_bytes;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Listing a directory or reading an entry failed
    #[error("failed traversing {path:?}")]
    Traverse {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    /// Reading the size of a tracked file failed
    #[error("failed reading metadata from {path:?}")]
    Stat {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A tracked file and its size in bytes
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Outcome of a complete audit
///
/// `records` is ordered by descending size whenever a threshold was crossed, otherwise it keeps
/// the traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AuditResult {
    pub records: Vec<FileRecord>,
    pub total_bytes: u64,
    pub any_large_file: bool,
    pub total_exceeded: bool,
}

impl AuditResult {
    pub fn file_count(&self) -> usize {
        self.records.len()
    }

    /// True when a threshold was crossed and the records should be written to a log
    pub fn needs_report(&self) -> bool {
        self.any_large_file || self.total_exceeded
    }
}

impl std::fmt::Display for AuditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "uncompressed files: {}\n\
            total size: {}\n\
            files above size threshold: {}\n\
            total above size threshold: {}",
            self.file_count(),
            format_bytes(self.total_bytes),
            self.any_large_file,
            self.total_exceeded
        )
    }
}

/// Warnings raised while auditing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent<'a> {
    /// A single file is above the per-file threshold
    LargeFile(&'a FileRecord),
    /// The sum of all tracked files is above the aggregate threshold
    TotalExceeded { files: usize, total_bytes: u64 },
}

/// Extension of a file name: everything from the last `.` on, including the dot
///
/// A name consisting of a leading dot only (e.g. `.bashrc`) is its own extension.
pub fn extension_of(file_name: &str) -> Option<&str> {
    file_name.rfind('.').map(|idx| &file_name[idx..])
}

/// Set of tracked extensions with the configured comparison rule
#[derive(Debug, Clone)]
pub struct ExtensionSet {
    extensions: HashSet<String>,
    mode: ExtensionMatch,
}

impl ExtensionSet {
    pub fn new<I, S>(extensions: I, mode: ExtensionMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| normalize(ext.as_ref(), mode))
            .collect();
        Self { extensions, mode }
    }

    pub fn contains(&self, extension: &str) -> bool {
        match self.mode {
            ExtensionMatch::Exact => self.extensions.contains(extension),
            ExtensionMatch::IgnoreAsciiCase => self
                .extensions
                .contains(&extension.to_ascii_lowercase()),
        }
    }

    /// True if `file_name` carries one of the tracked extensions
    pub fn matches(&self, file_name: &str) -> bool {
        extension_of(file_name).is_some_and(|ext| self.contains(ext))
    }
}

fn normalize(extension: &str, mode: ExtensionMatch) -> String {
    match mode {
        ExtensionMatch::Exact => extension.to_string(),
        ExtensionMatch::IgnoreAsciiCase => extension.to_ascii_lowercase(),
    }
}

/// Lazily walk `root` and yield a record for every tracked regular file
///
/// The sequence is finite and can't be restarted; errors are yielded in place of records.
pub fn candidates<'a>(
    root: &'a Path,
    extensions: &'a ExtensionSet,
) -> impl Iterator<Item = Result<FileRecord, AuditError>> + 'a {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| classify(root, extensions, entry).transpose())
}

fn classify(
    root: &Path,
    extensions: &ExtensionSet,
    entry: walkdir::Result<walkdir::DirEntry>,
) -> Result<Option<FileRecord>, AuditError> {
    let entry = entry.map_err(|source| {
        let path = source.path().unwrap_or(root).to_path_buf();
        AuditError::Traverse { path, source }
    })?;
    if !entry.file_type().is_file() || !extensions.matches(&entry.file_name().to_string_lossy())
    {
        return Ok(None);
    }
    let metadata = entry.metadata().map_err(|source| AuditError::Stat {
        path: entry.path().to_path_buf(),
        source,
    })?;
    Ok(Some(FileRecord {
        path: entry.into_path(),
        size_bytes: metadata.len(),
    }))
}

/// Running totals owned by a single audit
#[derive(Debug, Default)]
struct Accumulator {
    records: Vec<FileRecord>,
    total_bytes: u64,
    any_large_file: bool,
}

impl Accumulator {
    fn push(&mut self, record: FileRecord, large: bool) {
        // sparse files can claim sizes whose sum exceeds u64
        self.total_bytes = self.total_bytes.saturating_add(record.size_bytes);
        self.any_large_file |= large;
        self.records.push(record);
    }

    fn finish(self, total_size_threshold: u64) -> AuditResult {
        let mut result = AuditResult {
            total_exceeded: self.total_bytes > total_size_threshold,
            records: self.records,
            total_bytes: self.total_bytes,
            any_large_file: self.any_large_file,
        };
        if result.needs_report() {
            // stable: equal sizes keep traversal order
            result
                .records
                .sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        }
        result
    }
}

/// Audit `root` with the given settings
pub fn audit(root: &Path, settings: &AuditSettings) -> Result<AuditResult, AuditError> {
    audit_with(root, settings, |_| {})
}

/// Audit `root`, reporting threshold warnings to `on_event` as they are found
#[instrument(skip(settings, on_event))]
pub fn audit_with<F>(
    root: &Path,
    settings: &AuditSettings,
    mut on_event: F,
) -> Result<AuditResult, AuditError>
where
    F: FnMut(AuditEvent<'_>),
{
    let extensions = ExtensionSet::new(&settings.extensions, settings.extension_match);
    let mut acc = Accumulator::default();
    for record in candidates(root, &extensions) {
        let record = record?;
        tracing::trace!("tracked: {:?} ({} bytes)", record.path, record.size_bytes);
        let large = record.size_bytes > settings.file_size_threshold;
        if large {
            tracing::warn!(
                "{:?} is {}, exceeds the per-file threshold of {}",
                record.path,
                format_bytes(record.size_bytes),
                format_bytes(settings.file_size_threshold)
            );
            on_event(AuditEvent::LargeFile(&record));
        }
        acc.push(record, large);
    }
    let result = acc.finish(settings.total_size_threshold);
    if result.total_exceeded {
        tracing::warn!(
            "{} tracked files total {}, exceeds the aggregate threshold of {}",
            result.file_count(),
            format_bytes(result.total_bytes),
            format_bytes(settings.total_size_threshold)
        );
        on_event(AuditEvent::TotalExceeded {
            files: result.file_count(),
            total_bytes: result.total_bytes,
        });
    }
    tracing::debug!(
        "audit of {:?} done: {} files, {} bytes",
        root,
        result.file_count(),
        result.total_bytes
    );
    Ok(result)
}
