//! Frame sequence detection.
//!
//! The frame number of a file is the last run of ASCII digits in its stem
//! (the name before the final `.`), unless that run is a version marker
//! directly preceded by `v` or `V`. Files whose names agree on everything
//! around the frame number, including its width, form a sequence when there
//! are at least two of them.

use std::collections::BTreeMap;
use std::path::Path;

use crate::consts::DIGITS_REGEX;
use crate::node::{FileItem, ScanNode, SequenceItem};

/// Frame numbers are parsed as `u64`.
const MAX_FRAME_DIGITS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SequenceKey {
    prefix: String,
    padding: usize,
    suffix: String,
    extension: String,
}

fn frame_key(name: &str) -> Option<(SequenceKey, u64)> {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, extension),
        _ => (name, ""),
    };
    let digits = DIGITS_REGEX.find_iter(stem).last()?;
    if digits.len() > MAX_FRAME_DIGITS || stem[..digits.start()].ends_with(['v', 'V']) {
        return None;
    }
    let frame = digits.as_str().parse().ok()?;
    let key = SequenceKey {
        prefix: stem[..digits.start()].to_string(),
        padding: digits.len(),
        suffix: stem[digits.end()..].to_string(),
        extension: extension.to_string(),
    };
    Some((key, frame))
}

/// Collapses sorted, unique frames into inclusive contiguous ranges.
pub fn frame_ranges(frames: &[u64]) -> Vec<(u64, u64)> {
    let mut ranges: Vec<(u64, u64)> = Vec::new();
    for &frame in frames {
        match ranges.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(frame) => *end = frame,
            _ => ranges.push((frame, frame)),
        }
    }
    ranges
}

/// Formats frames as ranges (`1-3,7-8`), zero-padding each bound to `padding`.
///
/// ```
/// use shotsort_scan::format_ranges;
/// assert_eq!(format_ranges(&[1, 2, 3, 7, 8], 0), "1-3,7-8");
/// assert_eq!(format_ranges(&[1001, 1002, 1005], 4), "1001-1002,1005");
/// assert_eq!(format_ranges(&[1, 2], 4), "0001-0002");
/// ```
pub fn format_ranges(frames: &[u64], padding: usize) -> String {
    frame_ranges(frames)
        .into_iter()
        .map(|(start, end)| match start == end {
            true => format!("{start:0padding$}"),
            false => format!("{start:0padding$}-{end:0padding$}"),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn build_sequence(directory: &Path, key: SequenceKey, mut members: Vec<(u64, FileItem)>) -> SequenceItem {
    members.sort_by_key(|(frame, _)| *frame);
    let frames: Vec<u64> = members.iter().map(|(frame, _)| *frame).collect();
    let separator = match key.prefix.is_empty() || key.prefix.ends_with(['.', '_', '-']) {
        true => "",
        false => ".",
    };
    let extension = match key.extension.is_empty() {
        true => String::new(),
        false => format!(".{}", key.extension),
    };
    let display_name = format!(
        "{}{separator}[{}]{}{extension}",
        key.prefix,
        format_ranges(&frames, key.padding),
        key.suffix
    );
    SequenceItem {
        directory: directory.to_path_buf(),
        range: format_ranges(&frames, 0),
        size: members.iter().map(|(_, file)| file.size).sum(),
        frames,
        display_name,
        prefix: key.prefix,
        suffix: key.suffix,
        extension: key.extension,
        padding: key.padding,
    }
}

/// Groups one directory's files into sequences. Files that don't belong to a
/// sequence are returned as they are. The result is ordered by display name.
pub fn detect_sequences(directory: &Path, files: Vec<FileItem>) -> Vec<ScanNode> {
    let mut groups: BTreeMap<SequenceKey, Vec<(u64, FileItem)>> = BTreeMap::new();
    let mut nodes = Vec::new();
    for file in files {
        match file.utf8_name().and_then(frame_key) {
            Some((key, frame)) => groups.entry(key).or_default().push((frame, file)),
            None => nodes.push(ScanNode::File(file)),
        }
    }
    for (key, mut members) in groups {
        match members.len() {
            1 => nodes.extend(members.pop().map(|(_, file)| ScanNode::File(file))),
            _ => nodes.push(ScanNode::Sequence(build_sequence(directory, key, members))),
        }
    }
    nodes.sort_by(|a, b| a.name().cmp(b.name()));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    fn files(names: &[&str]) -> Vec<FileItem> {
        names.iter().map(|name| FileItem::new(PathBuf::from("/plates").join(name), 10)).collect()
    }

    fn sequences(nodes: &[ScanNode]) -> Vec<&SequenceItem> {
        nodes
            .iter()
            .filter_map(|n| match n {
                ScanNode::Sequence(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_contiguous_sequence() {
        let names: Vec<String> = (1001..=1050).map(|f| format!("shotA_comp_v001.{f:04}.exr")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let nodes = detect_sequences(Path::new("/plates"), files(&names));
        assert_eq!(nodes.len(), 1);
        let ScanNode::Sequence(sequence) = &nodes[0] else {
            panic!("expected a sequence, found {:?}", nodes[0]);
        };
        assert_eq!(sequence.range, "1001-1050");
        assert_eq!(sequence.display_name, "shotA_comp_v001.[1001-1050].exr");
        assert_eq!(sequence.frames.len(), 50);
        assert_eq!(sequence.size, 500);
        assert_eq!(sequence.padding, 4);
        assert_eq!(sequence.pattern(), Path::new("/plates/shotA_comp_v001.%04d.exr"));
    }

    #[test]
    fn test_gaps_produce_multiple_ranges() {
        let nodes = detect_sequences(
            Path::new("/plates"),
            files(&["a_1.exr", "a_2.exr", "a_3.exr", "a_7.exr", "a_8.exr"]),
        );
        let sequences = sequences(&nodes);
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].range, "1-3,7-8");
        assert_eq!(sequences[0].display_name, "a_[1-3,7-8].exr");
        assert!(!sequences[0].is_contiguous());
    }

    #[test]
    fn test_different_padding_does_not_merge() {
        let nodes = detect_sequences(Path::new("/plates"), files(&["a_1.exr", "a_01.exr"]));
        assert_eq!(nodes.len(), 2);
        assert!(sequences(&nodes).is_empty());
    }

    #[test]
    fn test_single_numbered_file_stays_a_file() {
        let nodes = detect_sequences(Path::new("/plates"), files(&["plate.1001.exr", "notes.txt"]));
        assert_eq!(nodes.iter().map(ScanNode::name).collect::<Vec<_>>(), ["notes.txt", "plate.1001.exr"]);
        assert!(sequences(&nodes).is_empty());
    }

    #[test]
    fn test_versions_are_not_frames() {
        let nodes = detect_sequences(
            Path::new("/plates"),
            files(&["sh010_comp_v001.nk", "sh010_comp_v002.nk", "sh010_comp_v003.nk"]),
        );
        assert_eq!(nodes.len(), 3);
        assert!(sequences(&nodes).is_empty());
    }

    #[test]
    fn test_numeric_frame_order() {
        let nodes = detect_sequences(Path::new("/plates"), files(&["r.10.exr", "r.9.exr", "r.11.exr", "r.8.exr"]));
        // `9` and `10` differ in width, so they can't be one sequence.
        let sequences = sequences(&nodes);
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].frames, [10, 11]);
        assert_eq!(sequences[1].frames, [8, 9]);
    }

    #[rstest]
    #[case(&["plate1001.exr", "plate1002.exr"], "plate.[1001-1002].exr")]
    #[case(&["plate-01.dpx", "plate-02.dpx"], "plate-[01-02].dpx")]
    #[case(&["0001.exr", "0002.exr"], "[0001-0002].exr")]
    #[case(&["beauty.0001_denoised.exr", "beauty.0002_denoised.exr"], "beauty.[0001-0002]_denoised.exr")]
    #[case(&["render_001", "render_002"], "render_[001-002]")]
    #[case(&["a.1.exr", "a.2.exr", "a.4.exr"], "a.[1-2,4].exr")]
    fn test_display_names(#[case] names: &[&str], #[case] expected: &str) {
        let nodes = detect_sequences(Path::new("/plates"), files(names));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name(), expected);
    }

    #[test]
    fn test_different_extensions_do_not_merge() {
        let nodes = detect_sequences(Path::new("/plates"), files(&["a.1.exr", "a.2.exr", "a.1.jpg", "a.2.jpg"]));
        let names: Vec<_> = nodes.iter().map(ScanNode::name).collect();
        assert_eq!(names, ["a.[1-2].exr", "a.[1-2].jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_not_grouped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let mut files = files(&["a.1.exr", "a.2.exr"]);
        files.push(FileItem::new(Path::new("/plates").join(OsStr::from_bytes(b"a.\xff3.exr")), 1));
        files.push(FileItem::new(Path::new("/plates").join(OsStr::from_bytes(b"\xffb.1.exr")), 1));
        files.push(FileItem::new(Path::new("/plates").join(OsStr::from_bytes(b"\xffb.2.exr")), 1));
        let nodes = detect_sequences(Path::new("/plates"), files);
        assert_eq!(nodes.len(), 4);
        assert_eq!(sequences(&nodes).len(), 1);
    }

    #[test]
    fn test_overlong_digit_runs_are_not_frames() {
        let nodes = detect_sequences(
            Path::new("/plates"),
            files(&["id_1234567890123456789.exr", "id_1234567890123456790.exr"]),
        );
        assert!(sequences(&nodes).is_empty());
    }

    #[test]
    fn test_frame_ranges() {
        assert!(frame_ranges(&[]).is_empty());
        assert_eq!(frame_ranges(&[5]), [(5, 5)]);
        assert_eq!(frame_ranges(&[1, 2, 3, 7, 8]), [(1, 3), (7, 8)]);
        assert_eq!(format_ranges(&[5], 0), "5");
    }
}
