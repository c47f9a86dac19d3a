//! Read-only scanning of production directory trees.
//!
//! [`scan`] walks a directory asynchronously and builds a [`ScanNode`] tree in
//! which numbered frame files are grouped into a single [`SequenceItem`]
//! (see [`detect_sequences`]). The filesystem is never modified.

mod consts;
pub mod error;
mod node;
mod sequence;
mod walk;

pub use crate::node::{DirectoryNode, FileItem, Item, ScanNode, SequenceItem};
pub use crate::sequence::{detect_sequences, format_ranges, frame_ranges};
pub use crate::walk::{ScanProgress, ScanReport, SkippedEntry, scan};
