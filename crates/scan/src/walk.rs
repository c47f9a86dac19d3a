//! Asynchronous, read-only directory walk.
//!
//! The tree is walked depth first. Every directory's files are handed to
//! [`detect_sequences`] before descending into its subdirectories, and the
//! progress callback is invoked once per directory. Problems below the root
//! never abort the scan: the entry is recorded in [`ScanReport::skipped`] and
//! the walk carries on.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::fs::{self, DirEntry};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::node::{DirectoryNode, FileItem, ScanNode};
use crate::sequence::detect_sequences;

#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// The directory just read.
    pub path: PathBuf,
    /// Files found so far, across the whole scan.
    pub files: usize,
    pub elapsed: Duration,
}

/// An entry that couldn't be read, or was deliberately not followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub root: DirectoryNode,
    pub skipped: Vec<SkippedEntry>,
    /// Number of files found, counting every frame of a sequence.
    pub files: usize,
}

type Progress<'a> = &'a mut (dyn FnMut(ScanProgress) + Send);

enum WalkEntry {
    File(FileItem),
    Descend(PathBuf),
    Skip,
}

struct Walker<'a> {
    started: Instant,
    files: usize,
    skipped: Vec<SkippedEntry>,
    progress: Progress<'a>,
    cancel: &'a CancellationToken,
}
impl Walker<'_> {
    fn skip(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        let entry = SkippedEntry {
            path: path.into(),
            reason: reason.into(),
        };
        tracing::warn!(path = %entry.path.display(), reason = %entry.reason, "skipping entry");
        self.skipped.push(entry);
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel.is_cancelled() {
            true => exn::bail!(ErrorKind::Cancelled),
            false => Ok(()),
        }
    }

    async fn process_entry(&mut self, entry: DirEntry) -> WalkEntry {
        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) => {
                self.skip(path, e.to_string());
                return WalkEntry::Skip;
            },
        };
        if file_type.is_dir() {
            return WalkEntry::Descend(path);
        }
        // Follows symlinks, so broken links end up here as errors.
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if file_type.is_symlink() => {
                self.skip(path, format!("broken symlink: {e}"));
                return WalkEntry::Skip;
            },
            Err(e) => {
                self.skip(path, e.to_string());
                return WalkEntry::Skip;
            },
        };
        if metadata.is_dir() {
            self.skip(path, "symlinked directory not followed");
            return WalkEntry::Skip;
        }
        if metadata.is_file() {
            return WalkEntry::File(FileItem::new(path, metadata.len()));
        }
        tracing::trace!(path = %path.display(), "ignoring special file");
        WalkEntry::Skip
    }

    /// Reads one directory and everything below it. `Ok(None)` means the
    /// directory couldn't be read and was recorded as skipped.
    fn walk<'a>(
        &'a mut self,
        directory: PathBuf,
        is_root: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<DirectoryNode>>> + Send + 'a>> {
        Box::pin(async move {
            self.check_cancelled()?;
            let mut entries = match fs::read_dir(&directory).await {
                Ok(entries) => entries,
                Err(e) if is_root => exn::bail!(ErrorKind::from_io(e, &directory)),
                Err(e) => {
                    self.skip(&directory, format!("unreadable directory: {e}"));
                    return Ok(None);
                },
            };
            let mut files = Vec::new();
            let mut subdirectories = Vec::new();
            loop {
                self.check_cancelled()?;
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        self.skip(&directory, format!("directory listing interrupted: {e}"));
                        break;
                    },
                };
                match self.process_entry(entry).await {
                    WalkEntry::File(file) => files.push(file),
                    WalkEntry::Descend(path) => subdirectories.push(path),
                    WalkEntry::Skip => {},
                }
            }
            self.files += files.len();
            (self.progress)(ScanProgress {
                path: directory.clone(),
                files: self.files,
                elapsed: self.started.elapsed(),
            });
            tracing::debug!(directory = %directory.display(), files = files.len(), "directory scanned");

            let mut children = detect_sequences(&directory, files);
            subdirectories.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            for subdirectory in subdirectories {
                if let Some(node) = self.walk(subdirectory, false).await? {
                    children.push(ScanNode::Directory(node));
                }
            }
            Ok(Some(DirectoryNode::new(directory, children)))
        })
    }
}

/// Scans `root`, grouping frame sequences in every directory.
///
/// Fails if the root is missing, unreadable or not a directory, or if the
/// scan is cancelled through `cancel`.
#[instrument(skip(progress, cancel), fields(root = %root.display()))]
pub async fn scan(
    root: &Path,
    progress: &mut (dyn FnMut(ScanProgress) + Send),
    cancel: &CancellationToken,
) -> Result<ScanReport> {
    let metadata = fs::metadata(root).await.map_err(|e| ErrorKind::from_io(e, root))?;
    if !metadata.is_dir() {
        exn::bail!(ErrorKind::NotADirectory(root.to_path_buf()));
    }
    let mut walker = Walker {
        started: Instant::now(),
        files: 0,
        skipped: Vec::new(),
        progress,
        cancel,
    };
    let Some(tree) = walker.walk(root.to_path_buf(), true).await? else {
        // The root is never skipped; read errors on it are returned above.
        exn::bail!(ErrorKind::NotADirectory(root.to_path_buf()));
    };
    tracing::debug!(files = walker.files, skipped = walker.skipped.len(), "scan complete");
    Ok(ScanReport {
        root: tree,
        skipped: walker.skipped,
        files: walker.files,
    })
}
