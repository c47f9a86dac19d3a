use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shotsort_config::{Catalog, Profile, Settings, TemplateContext, error::ErrorKind as ConfigErrorKind, validate_path};
use shotsort_extract::Tags;
use shotsort_scan::{DirectoryNode, Item};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::mapping::error::{ErrorKind, Result};
use crate::mapping::{Proposal, ProposalId, Resolution};

/// Reported once per directory while proposals are generated.
#[derive(Debug, Clone)]
pub struct MappingProgress {
    pub directory: PathBuf,
    /// Items mapped so far.
    pub mapped: usize,
    /// Items in the whole tree.
    pub total: usize,
}

/// Turns scanned items into [`Proposal`]s using one profile.
///
/// The generator owns a snapshot of the configuration it was created with,
/// so proposals (and later recomputes) are unaffected by configuration
/// reloads.
#[derive(Debug, Clone)]
pub struct MappingGenerator {
    catalog: Arc<Catalog>,
    profile: Arc<Profile>,
    destination: PathBuf,
    settings: Settings,
    source_root: Option<PathBuf>,
}
impl MappingGenerator {
    pub fn new(catalog: Arc<Catalog>, profile: Arc<Profile>, destination: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            catalog,
            profile,
            destination: destination.into(),
            settings,
            source_root: None,
        }
    }

    /// Unmatched items keep their directory relative to `root` under the
    /// unmatched directory. Without a source root they are placed flat.
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every tag extractor against the item's display name.
    pub fn extract(&self, item: &Item) -> Result<Tags> {
        if let Item::File(file) = item
            && file.utf8_name().is_none()
        {
            exn::bail!(ErrorKind::NonUtf8Name(file.path.clone()));
        }
        Ok(self.catalog.extractor().extract_all(item.display_name()).tags)
    }

    /// Matches `tags` against the profile and renders the destination of the
    /// first matching rule. Items no rule matches go to the unmatched
    /// directory under their own name.
    pub fn resolve(&self, item: &Item, tags: &Tags) -> Result<Resolution> {
        let name = item.display_name();
        let Some((index, rule)) = self.profile.classify(tags) else {
            let relative = validate_path(self.unmatched_path(item)).map_err(|e| template_error(e, "unmatched"))?;
            return Ok(Resolution {
                destination: self.destination.join(relative),
                rule: None,
            });
        };
        let mut context = TemplateContext::new(tags, name).with_missing(&self.settings.missing_tag);
        if let Item::Sequence(sequence) = item {
            context = context.with_sequence(&sequence.range, sequence.padding);
        }
        let relative = rule.template.render(&context).map_err(|e| template_error(e, &rule.label()))?;
        Ok(Resolution {
            destination: self.destination.join(relative),
            rule: Some(index),
        })
    }

    fn unmatched_path(&self, item: &Item) -> PathBuf {
        let mut path = PathBuf::from(&self.settings.unmatched_dir);
        let source = item.source();
        let directory = self
            .source_root
            .as_deref()
            .zip(source.parent())
            .and_then(|(root, parent)| parent.strip_prefix(root).ok());
        if let Some(directory) = directory {
            path.push(directory);
        }
        path.push(item.display_name());
        path
    }

    /// Builds the proposal for one item. Never fails: problems are recorded
    /// on the proposal with [`Status::Error`](crate::Status::Error).
    pub fn propose(&self, id: ProposalId, item: Item) -> Proposal {
        let tags = match self.extract(&item) {
            Ok(tags) => tags,
            Err(e) => return failed(id, item, Tags::default(), &e),
        };
        match self.resolve(&item, &tags) {
            Ok(resolution) => {
                tracing::trace!(%id, name = item.display_name(), rule = ?resolution.rule, "item mapped");
                Proposal::resolved(id, item, tags, resolution)
            },
            Err(e) => failed(id, item, tags, &e),
        }
    }

    /// Proposes a destination for every item under `root`, in scan order.
    ///
    /// `status` is called once per directory. Cancellation is checked before
    /// every item. Once all items are mapped, proposals whose destinations
    /// collide are resolved with [`resolve_collisions`].
    #[instrument(skip_all, fields(root = %root.path.display(), profile = %self.profile.name))]
    pub fn generate(
        &self,
        root: &DirectoryNode,
        status: &mut (dyn FnMut(MappingProgress) + Send),
        cancel: &CancellationToken,
    ) -> Result<Vec<Proposal>> {
        let total = root.item_count();
        let mut proposals = Vec::with_capacity(total);
        for directory in root.directories() {
            for item in directory.items() {
                if cancel.is_cancelled() {
                    exn::bail!(ErrorKind::Cancelled);
                }
                let id = ProposalId(proposals.len() as u64 + 1);
                proposals.push(self.propose(id, item));
            }
            status(MappingProgress {
                directory: directory.path.clone(),
                mapped: proposals.len(),
                total,
            });
        }
        resolve_collisions(&mut proposals);
        Ok(proposals)
    }
}

fn template_error(e: exn::Exn<ConfigErrorKind>, rule: &str) -> exn::Exn<ErrorKind> {
    let reason = e.deref().to_string();
    e.raise(ErrorKind::Template {
        rule: rule.to_string(),
        reason,
    })
}

fn failed(id: ProposalId, item: Item, tags: Tags, error: &exn::Exn<ErrorKind>) -> Proposal {
    let message = error.deref().to_string();
    tracing::debug!(%id, name = item.display_name(), error = %message, "item could not be mapped");
    Proposal::failed(id, item, tags, message)
}

/// Gives each destination to the first proposal that claims it, unmatched
/// ones included. Later claimants are turned into errors naming the first.
pub fn resolve_collisions(proposals: &mut [Proposal]) {
    let mut claimed: HashMap<PathBuf, ProposalId> = HashMap::new();
    for proposal in proposals.iter_mut() {
        let Some(destination) = proposal.destination().map(Path::to_path_buf) else {
            continue;
        };
        match claimed.get(&destination) {
            Some(first) => {
                tracing::warn!(id = %proposal.id(), first = %first, destination = %destination.display(), "destination collision");
                proposal.fail(ErrorKind::Collision(*first).to_string());
            },
            None => {
                claimed.insert(destination, proposal.id());
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Status;
    use shotsort_config::{ClassificationRule, Predicate};
    use shotsort_extract::{Category, PatternRule, PatternSet, TagExtractor};
    use shotsort_scan::{FileItem, ScanNode, detect_sequences};

    fn catalog() -> Arc<Catalog> {
        let extractor = TagExtractor::new([
            PatternSet::new(Category::Shot, vec![PatternRule::regex(r"^([A-Za-z]+\d+)_").unwrap()]),
            PatternSet::new(Category::Task, vec![PatternRule::keyword("comp").unwrap(), PatternRule::keyword("roto").unwrap()]),
            PatternSet::new(Category::Version, vec![PatternRule::regex(r"_(v\d+)").unwrap()]),
        ]);
        Arc::new(Catalog::new(extractor, []))
    }

    fn profile() -> Arc<Profile> {
        Arc::new(Profile::new(
            "test",
            vec![
                ClassificationRule::new("{shot}/comp/v{version}/".parse().unwrap())
                    .when(Category::Task, Predicate::contains("comp")),
                ClassificationRule::new("{shot}/{task}/".parse().unwrap()).when(Category::Task, Predicate::Present(true)),
            ],
        ))
    }

    fn generator(profile: Arc<Profile>) -> MappingGenerator {
        MappingGenerator::new(catalog(), profile, "/out", Settings::default()).with_source_root("/in")
    }

    fn file(path: &str) -> Item {
        Item::File(FileItem::new(path, 1))
    }

    #[test]
    fn test_propose_matches_first_rule() {
        let proposal = generator(profile()).propose(ProposalId(1), file("/in/sh010_comp_v2.nk"));
        assert_eq!(proposal.status(), Status::Auto);
        assert_eq!(proposal.matched_rule(), Some(0));
        assert_eq!(proposal.destination(), Some(Path::new("/out/sh010/comp/v002/sh010_comp_v2.nk")));
        assert_eq!(proposal.tags().get(Category::Version), Some("v002"));
    }

    #[test]
    fn test_missing_tags_use_the_token() {
        let proposal = generator(profile()).propose(ProposalId(1), file("/in/roto_notes.txt"));
        assert_eq!(proposal.matched_rule(), Some(1));
        assert_eq!(proposal.destination(), Some(Path::new("/out/NOTAG/roto/roto_notes.txt")));
    }

    #[test]
    fn test_unmatched_items_are_ambiguous() {
        let proposal = generator(profile()).propose(ProposalId(1), file("/in/readme.md"));
        assert_eq!(proposal.status(), Status::Ambiguous);
        assert_eq!(proposal.matched_rule(), None);
        assert_eq!(proposal.destination(), Some(Path::new("/out/unmatched/readme.md")));
    }

    #[test]
    fn test_template_failures_are_captured() {
        let profile = Arc::new(Profile::new("bad", vec![ClassificationRule::new("{shot}/".parse().unwrap())]));
        let tags = Tags::default().with(Category::Shot, "../..".to_string());
        let generator = generator(profile);
        let error = generator.resolve(&file("/in/a.exr"), &tags).unwrap_err();
        assert!(matches!(&*error, ErrorKind::Template { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_errors() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let item = Item::File(FileItem::new(Path::new("/in").join(OsStr::from_bytes(b"sh010_\xff.exr")), 1));
        let proposal = generator(profile()).propose(ProposalId(1), item);
        assert_eq!(proposal.status(), Status::Error);
        assert!(proposal.error().unwrap().contains("not valid UTF-8"));
        assert_eq!(proposal.destination(), None);
    }

    fn tree() -> DirectoryNode {
        let plates: Vec<_> = (1001..=1003).map(|f| FileItem::new(format!("/in/sh010/sh010_comp_v1.{f}.exr"), 1)).collect();
        let sh010 = DirectoryNode::new("/in/sh010", detect_sequences(Path::new("/in/sh010"), plates));
        let mut children = detect_sequences(
            Path::new("/in"),
            vec![FileItem::new("/in/readme.md", 1), FileItem::new("/in/sh020_roto_v1.nk", 1)],
        );
        children.push(ScanNode::Directory(sh010));
        DirectoryNode::new("/in", children)
    }

    #[test]
    fn test_generate_in_scan_order() {
        let mut progress = Vec::new();
        let proposals = generator(profile())
            .generate(&tree(), &mut |p| progress.push(p), &CancellationToken::new())
            .unwrap();
        let names: Vec<_> = proposals.iter().map(|p| p.item().display_name()).collect();
        assert_eq!(names, ["readme.md", "sh020_roto_v1.nk", "sh010_comp_v1.[1001-1003].exr"]);
        let ids: Vec<_> = proposals.iter().map(|p| p.id()).collect();
        assert_eq!(ids, [ProposalId(1), ProposalId(2), ProposalId(3)]);
        assert_eq!(
            proposals[2].destination(),
            Some(Path::new("/out/sh010/comp/v001/sh010_comp_v1.[1001-1003].exr"))
        );
        assert_eq!(progress.len(), 2);
        assert_eq!((progress[1].mapped, progress[1].total), (3, 3));
    }

    #[test]
    fn test_generate_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = generator(profile()).generate(&tree(), &mut |_| {}, &cancel).unwrap_err();
        assert!(matches!(&*error, ErrorKind::Cancelled));
    }

    #[test]
    fn test_collisions_keep_the_first_claim() {
        let profile = Arc::new(Profile::new("flat", vec![ClassificationRule::new("all/{shot}.nk".parse().unwrap())]));
        let generator = generator(profile);
        let mut proposals = vec![
            generator.propose(ProposalId(1), file("/in/a/sh010_comp.nk")),
            generator.propose(ProposalId(2), file("/in/b/sh010_roto.nk")),
            generator.propose(ProposalId(3), file("/in/c/sh020_roto.nk")),
        ];
        resolve_collisions(&mut proposals);
        assert_eq!(proposals[0].status(), Status::Auto);
        assert_eq!(proposals[1].status(), Status::Error);
        assert_eq!(proposals[1].error(), Some("destination collides with proposal #1"));
        assert_eq!(proposals[2].status(), Status::Auto);
    }

    #[test]
    fn test_unmatched_items_keep_their_directory() {
        let empty = Arc::new(Profile::new("empty", Vec::new()));
        let mut proposals = vec![
            generator(empty.clone()).propose(ProposalId(1), file("/in/a/readme.md")),
            generator(empty.clone()).propose(ProposalId(2), file("/in/b/readme.md")),
        ];
        resolve_collisions(&mut proposals);
        assert_eq!(proposals[0].destination(), Some(Path::new("/out/unmatched/a/readme.md")));
        assert_eq!(proposals[1].destination(), Some(Path::new("/out/unmatched/b/readme.md")));
        assert!(proposals.iter().all(|p| p.status() == Status::Ambiguous));
    }

    #[test]
    fn test_unmatched_collisions_are_errors() {
        let empty = Arc::new(Profile::new("empty", Vec::new()));
        let flat = MappingGenerator::new(catalog(), empty, "/out", Settings::default());
        let mut proposals = vec![
            flat.propose(ProposalId(1), file("/in/a/readme.md")),
            flat.propose(ProposalId(2), file("/in/b/readme.md")),
        ];
        resolve_collisions(&mut proposals);
        assert_eq!(proposals[0].status(), Status::Ambiguous);
        assert_eq!(proposals[0].destination(), Some(Path::new("/out/unmatched/readme.md")));
        assert_eq!(proposals[1].status(), Status::Error);
        assert_eq!(proposals[1].error(), Some("destination collides with proposal #1"));
    }
}
