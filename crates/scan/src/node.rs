use std::path::{Path, PathBuf};

/// A single file that isn't part of a frame sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    /// File name; lossy if the name on disk isn't valid UTF-8.
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}
impl FileItem {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self { name, path, size }
    }

    /// The file name, only if it is valid UTF-8.
    pub fn utf8_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Numbered files in one directory that share everything but the frame
/// number, e.g. `plate.1001.exr` to `plate.1050.exr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceItem {
    pub directory: PathBuf,
    /// Everything before the frame number (`plate.`).
    pub prefix: String,
    /// Everything between the frame number and the extension.
    pub suffix: String,
    /// Extension without the dot; empty if the files have none.
    pub extension: String,
    /// Width of the frame number, including zero padding.
    pub padding: usize,
    /// Sorted and unique; always at least two.
    pub frames: Vec<u64>,
    /// Contiguous ranges without padding (`1-3,7-8`).
    pub range: String,
    /// Combined size of every frame.
    pub size: u64,
    /// Bracketed name, e.g. `plate.[1001-1050].exr`.
    pub display_name: String,
}
impl SequenceItem {
    fn file_name(&self, frame: &str) -> String {
        match self.extension.is_empty() {
            true => format!("{}{frame}{}", self.prefix, self.suffix),
            false => format!("{}{frame}{}.{}", self.prefix, self.suffix, self.extension),
        }
    }

    /// The printf-style pattern of the frame files (`dir/plate.%04d.exr`).
    pub fn pattern(&self) -> PathBuf {
        self.directory.join(self.file_name(&format!("%0{}d", self.padding)))
    }

    pub fn frame_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.frames
            .iter()
            .map(|frame| self.directory.join(self.file_name(&format!("{frame:0width$}", width = self.padding))))
    }

    pub fn first_frame(&self) -> u64 {
        self.frames.first().copied().unwrap_or_default()
    }

    pub fn last_frame(&self) -> u64 {
        self.frames.last().copied().unwrap_or_default()
    }

    /// `true` if there are no missing frames between the first and last.
    pub fn is_contiguous(&self) -> bool {
        !self.range.contains(',')
    }
}

/// Something that gets a destination: a file or a whole sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    File(FileItem),
    Sequence(SequenceItem),
}
impl Item {
    /// The name used for tag extraction and for the destination.
    pub fn display_name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Sequence(sequence) => &sequence.display_name,
        }
    }

    /// The file, or the printf-style pattern of the sequence.
    pub fn source(&self) -> PathBuf {
        match self {
            Self::File(file) => file.path.clone(),
            Self::Sequence(sequence) => sequence.pattern(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::File(file) => file.size,
            Self::Sequence(sequence) => sequence.size,
        }
    }

    /// Number of files on disk this item stands for.
    pub fn file_count(&self) -> usize {
        match self {
            Self::File(_) => 1,
            Self::Sequence(sequence) => sequence.frames.len(),
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// Extension without the dot, lowercase.
    pub fn extension(&self) -> String {
        match self {
            Self::File(file) => file.path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default(),
            Self::Sequence(sequence) => sequence.extension.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub name: String,
    pub path: PathBuf,
    /// Items (by display name) first, then subdirectories (by name).
    pub children: Vec<ScanNode>,
}
impl DirectoryNode {
    pub fn new(path: impl Into<PathBuf>, children: Vec<ScanNode>) -> Self {
        let path = path.into();
        let name = directory_name(&path);
        Self { name, path, children }
    }

    /// Files and sequences directly inside this directory.
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.children.iter().filter_map(|child| match child {
            ScanNode::File(file) => Some(Item::File(file.clone())),
            ScanNode::Sequence(sequence) => Some(Item::Sequence(sequence.clone())),
            ScanNode::Directory(_) => None,
        })
    }

    /// This directory followed by every directory below it, depth first.
    pub fn directories(&self) -> Vec<&DirectoryNode> {
        let mut directories = vec![self];
        for child in &self.children {
            if let ScanNode::Directory(directory) = child {
                directories.extend(directory.directories());
            }
        }
        directories
    }

    /// Number of items (files and sequences) in the whole tree.
    pub fn item_count(&self) -> usize {
        self.directories().iter().map(|d| d.items().count()).sum()
    }

    /// Number of files on disk in the whole tree.
    pub fn file_count(&self) -> usize {
        self.directories().iter().flat_map(|d| d.items()).map(|i| i.file_count()).sum()
    }
}

fn directory_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanNode {
    Directory(DirectoryNode),
    File(FileItem),
    Sequence(SequenceItem),
}
impl ScanNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(directory) => &directory.name,
            Self::File(file) => &file.name,
            Self::Sequence(sequence) => &sequence.display_name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}
impl From<Item> for ScanNode {
    fn from(item: Item) -> Self {
        match item {
            Item::File(file) => Self::File(file),
            Item::Sequence(sequence) => Self::Sequence(sequence),
        }
    }
}
