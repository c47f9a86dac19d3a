use std::collections::BTreeMap;

use derive_more::Display;
use shotsort_extract::Category;
use shotsort_scan::Item;

use crate::mapping::Proposal;

/// A logical icon category; front ends pick the actual artwork.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconHint {
    #[display("sequence")]
    Sequence,
    #[display("image-file")]
    Image,
    #[display("video-file")]
    Video,
    #[display("audio-file")]
    Audio,
    #[display("scene-file")]
    Scene,
    #[display("file")]
    File,
}
impl IconHint {
    pub fn for_item(item: &Item) -> Self {
        if item.is_sequence() {
            return Self::Sequence;
        }
        match item.extension().as_str() {
            "exr" | "dpx" | "cin" | "tif" | "tiff" | "png" | "jpg" | "jpeg" | "tga" | "hdr" | "psd" => Self::Image,
            "mov" | "mp4" | "m4v" | "mxf" | "avi" | "mkv" | "webm" | "r3d" | "braw" => Self::Video,
            "wav" | "aif" | "aiff" | "mp3" | "flac" | "ogg" => Self::Audio,
            "nk" | "nknc" | "hip" | "hiplc" | "hipnc" | "ma" | "mb" | "blend" | "c4d" | "max" | "usd" | "usda"
            | "usdc" | "abc" | "spp" => Self::Scene,
            _ => Self::File,
        }
    }
}

/// What a front end needs to show one proposal in a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDetails {
    /// Column name to cell text. Tag columns are named after their category
    /// and are empty when the tag is missing.
    pub columns: BTreeMap<&'static str, String>,
    pub icon_hint: IconHint,
    pub tooltip: String,
}

pub fn display_details(proposal: &Proposal) -> DisplayDetails {
    let item = proposal.item();
    let mut columns = BTreeMap::new();
    columns.insert("name", item.display_name().to_string());
    columns.insert("status", proposal.status().to_string());
    columns.insert(
        "destination",
        proposal.destination().map(|d| d.display().to_string()).unwrap_or_default(),
    );
    columns.insert("size", format_size(item.size()));
    columns.insert("files", item.file_count().to_string());
    for category in Category::ALL {
        columns.insert(category.as_str(), proposal.tags().get(category).unwrap_or_default().to_string());
    }

    let mut tooltip = item.source().display().to_string();
    if let Item::Sequence(sequence) = item {
        tooltip.push_str(&format!("\nframes {} ({} files)", sequence.range, sequence.frames.len()));
    }
    if let Some(error) = proposal.error() {
        tooltip.push_str(&format!("\n{error}"));
    }
    DisplayDetails {
        columns,
        icon_hint: IconHint::for_item(item),
        tooltip,
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{size:.1} {}", UNITS[unit]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ProposalId, Resolution};
    use rstest::rstest;
    use shotsort_extract::Tags;
    use shotsort_scan::{FileItem, SequenceItem};
    use std::path::PathBuf;

    fn sequence() -> Item {
        Item::Sequence(SequenceItem {
            directory: PathBuf::from("/in"),
            prefix: "bg.".to_string(),
            suffix: String::new(),
            extension: "exr".to_string(),
            padding: 4,
            frames: vec![1, 2, 3, 5],
            range: "1-3,5".to_string(),
            size: 4096,
            display_name: "bg.[0001-0003,0005].exr".to_string(),
        })
    }

    #[rstest]
    #[case("/in/plate.EXR", IconHint::Image)]
    #[case("/in/edit.mov", IconHint::Video)]
    #[case("/in/temp.wav", IconHint::Audio)]
    #[case("/in/sh010_comp_v001.nk", IconHint::Scene)]
    #[case("/in/notes.txt", IconHint::File)]
    #[case("/in/README", IconHint::File)]
    fn test_icon_hints(#[case] path: &str, #[case] expected: IconHint) {
        assert_eq!(IconHint::for_item(&Item::File(FileItem::new(path, 1))), expected);
    }

    #[test]
    fn test_sequence_details() {
        let tags = Tags::default().with(Category::Shot, "bg".to_string());
        let resolution = Resolution {
            destination: PathBuf::from("/out/bg/bg.[0001-0003,0005].exr"),
            rule: Some(0),
        };
        let proposal = Proposal::resolved(ProposalId(1), sequence(), tags, resolution);
        let details = display_details(&proposal);
        assert_eq!(details.icon_hint, IconHint::Sequence);
        assert_eq!(details.icon_hint.to_string(), "sequence");
        assert_eq!(details.columns["status"], "auto");
        assert_eq!(details.columns["shot"], "bg");
        assert_eq!(details.columns["task"], "");
        assert_eq!(details.columns["files"], "4");
        assert_eq!(details.columns["size"], "4.0 KiB");
        assert_eq!(details.tooltip, "/in/bg.%04d.exr\nframes 1-3,5 (4 files)");
    }

    #[test]
    fn test_error_details() {
        let proposal = Proposal::failed(ProposalId(2), Item::File(FileItem::new("/in/a.txt", 12)), Tags::default(), "boom");
        let details = display_details(&proposal);
        assert_eq!(details.columns["destination"], "");
        assert_eq!(details.columns["status"], "error");
        assert_eq!(details.columns["size"], "12 B");
        assert_eq!(details.tooltip, "/in/a.txt\nboom");
    }
}
