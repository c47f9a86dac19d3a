use std::path::{Path, PathBuf};

use derive_more::Display;
use shotsort_extract::Tags;
use shotsort_scan::Item;

/// Identifies a proposal within one run. Ids start at 1 and follow scan order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("#{_0}")]
pub struct ProposalId(pub u64);

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// A profile rule matched and produced the destination.
    #[display("auto")]
    Auto,
    /// The destination was committed after editing tags.
    #[display("manual")]
    Manual,
    /// No rule matched; the destination is under the unmatched directory.
    #[display("ambiguous")]
    Ambiguous,
    #[display("error")]
    Error,
}

/// What the profile decided for an item's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Absolute destination (joined onto the destination root).
    pub destination: PathBuf,
    /// Index of the matched rule, or `None` for the unmatched fallback.
    pub rule: Option<usize>,
}

/// A source/destination pair for whoever performs the actual copy or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// The file, or the printf-style frame pattern of a sequence.
    pub source: PathBuf,
    pub destination: PathBuf,
    pub is_sequence: bool,
}

/// The proposed destination of one scanned item.
///
/// Only [`Normalization::commit`](crate::Normalization::commit) changes a
/// proposal after it is created, and never its id or item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    id: ProposalId,
    item: Item,
    tags: Tags,
    destination: Option<PathBuf>,
    matched_rule: Option<usize>,
    status: Status,
    error: Option<String>,
}
impl Proposal {
    pub(crate) fn resolved(id: ProposalId, item: Item, tags: Tags, resolution: Resolution) -> Self {
        Self {
            id,
            item,
            tags,
            status: match resolution.rule {
                Some(_) => Status::Auto,
                None => Status::Ambiguous,
            },
            destination: Some(resolution.destination),
            matched_rule: resolution.rule,
            error: None,
        }
    }

    pub(crate) fn failed(id: ProposalId, item: Item, tags: Tags, message: impl Into<String>) -> Self {
        Self {
            id,
            item,
            tags,
            destination: None,
            matched_rule: None,
            status: Status::Error,
            error: Some(message.into()),
        }
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.destination = None;
        self.status = Status::Error;
        self.error = Some(message.into());
    }

    pub(crate) fn commit(&mut self, tags: Tags, resolution: Resolution) {
        self.tags = tags;
        self.destination = Some(resolution.destination);
        self.matched_rule = resolution.rule;
        self.status = Status::Manual;
        self.error = None;
    }

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn matched_rule(&self) -> Option<usize> {
        self.matched_rule
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `true` for proposals whose destination was decided by a rule or a user.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, Status::Auto | Status::Manual)
    }

    /// The transfer for this proposal, if it is settled.
    pub fn transfer(&self) -> Option<Transfer> {
        let destination = self.destination.clone().filter(|_| self.is_settled())?;
        Some(Transfer {
            source: self.item.source(),
            destination,
            is_sequence: self.item.is_sequence(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotsort_scan::FileItem;

    fn item() -> Item {
        Item::File(FileItem::new("/in/a.exr", 1))
    }

    #[test]
    fn test_status_follows_resolution() {
        let resolution = Resolution {
            destination: PathBuf::from("/out/a.exr"),
            rule: Some(0),
        };
        let proposal = Proposal::resolved(ProposalId(1), item(), Tags::default(), resolution.clone());
        assert_eq!(proposal.status(), Status::Auto);
        assert!(proposal.transfer().is_some());

        let resolution = Resolution { rule: None, ..resolution };
        let proposal = Proposal::resolved(ProposalId(2), item(), Tags::default(), resolution);
        assert_eq!(proposal.status(), Status::Ambiguous);
        assert!(proposal.destination().is_some());
        assert!(proposal.transfer().is_none());
    }

    #[test]
    fn test_failures_clear_the_destination() {
        let resolution = Resolution {
            destination: PathBuf::from("/out/a.exr"),
            rule: Some(0),
        };
        let mut proposal = Proposal::resolved(ProposalId(1), item(), Tags::default(), resolution.clone());
        proposal.fail("boom");
        assert_eq!(proposal.status(), Status::Error);
        assert_eq!(proposal.destination(), None);
        assert_eq!(proposal.error(), Some("boom"));

        proposal.commit(Tags::default(), resolution);
        assert_eq!(proposal.status(), Status::Manual);
        assert_eq!(proposal.error(), None);
        assert_eq!(proposal.id(), ProposalId(1));
        let transfer = proposal.transfer().unwrap();
        assert_eq!(transfer.source, Path::new("/in/a.exr"));
        assert!(!transfer.is_sequence);
    }

    #[test]
    fn test_display() {
        assert_eq!(ProposalId(7).to_string(), "#7");
        assert_eq!(Status::Ambiguous.to_string(), "ambiguous");
    }
}
