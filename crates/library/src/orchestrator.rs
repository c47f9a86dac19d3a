//! Run orchestration: scan a source tree, then map every item to a
//! destination, on a background task.
//!
//! An [`Orchestrator`] runs one normalization at a time. Starting a run hands
//! back a [`NormalizationJob`] that streams [`Event`]s, exposes the
//! [`RunState`] through a `watch` channel and finally resolves to a
//! [`Normalization`] the caller owns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::Display;
use exn::ResultExt;
use shotsort_config::{PatternStore, Settings};
use shotsort_extract::TagEdits;
use shotsort_scan::error::ErrorKind as ScanErrorKind;
use shotsort_scan::{ScanProgress, ScanReport, SkippedEntry, scan};
use tokio::runtime::Handle;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::mapping::error::{ErrorKind as MappingErrorKind, Result as MappingResult};
use crate::mapping::{MappingGenerator, MappingProgress, Proposal, ProposalId, Status, Transfer};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    #[display("idle")]
    Idle,
    #[display("scanning")]
    Scanning,
    #[display("scan complete")]
    ScanComplete,
    #[display("scan failed")]
    ScanFailed,
    #[display("mapping")]
    Mapping,
    /// Some proposals are errors, or the mapping pass itself failed. Followed
    /// by [`RunState::Done`] whenever proposals were produced.
    #[display("mapping finished with errors")]
    MappingFailedPartial,
    #[display("done")]
    Done,
    #[display("cancelled")]
    Cancelled,
}
impl RunState {
    /// `true` once the run can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ScanFailed | Self::Done | Self::Cancelled)
    }
}

/// Progress reported by a running job, in the order it happens.
#[derive(Debug, Clone)]
pub enum Event {
    Scan(ScanProgress),
    /// An entry the scan couldn't read or didn't follow. Sent once the scan
    /// has finished.
    ScanWarning(SkippedEntry),
    Mapping(MappingProgress),
}

pub struct Orchestrator {
    store: Arc<PatternStore>,
    settings: Settings,
    run_lock: Arc<Mutex<()>>,
    state: Arc<watch::Sender<RunState>>,
}
impl Orchestrator {
    pub fn new(store: PatternStore, settings: Settings) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            store: Arc::new(store),
            settings,
            run_lock: Arc::new(Mutex::new(())),
            state: Arc::new(state),
        }
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Names of the profiles in the active configuration, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        self.store.profile_names()
    }

    /// The state of the current (or most recent) run.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Re-reads the pattern and profile documents. Refused while a run is in
    /// flight; on failure the previous configuration stays active.
    pub fn reload_patterns(&self) -> Result<()> {
        let _guard = self.run_lock.try_lock().map_err(|_| ErrorKind::Busy)?;
        self.store.reload().or_raise(|| ErrorKind::Config)
    }

    /// Starts scanning `source` and mapping it onto `destination` with the
    /// named profile. Must be called from within a Tokio runtime.
    #[instrument(skip(self, source, destination), fields(source = %source.as_ref().display()))]
    pub fn scan_and_normalize(
        &self,
        source: impl AsRef<Path>,
        profile: &str,
        destination: impl Into<PathBuf>,
    ) -> Result<NormalizationJob> {
        let guard = self.run_lock.clone().try_lock_owned().map_err(|_| ErrorKind::Busy)?;
        let catalog = self.store.catalog();
        let Some(profile) = catalog.profile(profile) else {
            exn::bail!(ErrorKind::UnknownProfile(profile.to_string()));
        };
        let runtime = Handle::try_current().map_err(|_| ErrorKind::NoRuntime)?;

        let generator = MappingGenerator::new(catalog, profile, destination, self.settings.clone())
            .with_source_root(source.as_ref());
        let (events, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        self.state.send_replace(RunState::Scanning);
        tracing::info!(profile = %generator.profile().name, destination = %generator.destination().display(), "starting run");

        let run = Run {
            source: source.as_ref().to_path_buf(),
            generator,
            events,
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
            _guard: guard,
        };
        Ok(NormalizationJob {
            events: receiver,
            state: self.state.subscribe(),
            cancel,
            handle: runtime.spawn(run.execute()),
        })
    }
}

/// Everything a background run owns. Dropping it releases the run lock.
struct Run {
    source: PathBuf,
    generator: MappingGenerator,
    events: mpsc::UnboundedSender<Event>,
    state: Arc<watch::Sender<RunState>>,
    cancel: CancellationToken,
    _guard: OwnedMutexGuard<()>,
}
impl Run {
    fn emit(&self, event: Event) {
        // The receiver may have been dropped; the run carries on regardless.
        let _ = self.events.send(event);
    }

    fn enter(&self, state: RunState) {
        tracing::debug!(%state, "run state changed");
        self.state.send_replace(state);
    }

    async fn execute(self) -> Result<Normalization> {
        let events = self.events.clone();
        let report = scan(&self.source, &mut |p| {
            let _ = events.send(Event::Scan(p));
        }, &self.cancel).await;
        let report = match report {
            Ok(report) => report,
            Err(e) if matches!(&*e, ScanErrorKind::Cancelled) => {
                self.enter(RunState::Cancelled);
                return Err(e.raise(ErrorKind::Cancelled));
            },
            Err(e) => {
                let kind: &ScanErrorKind = &e;
                tracing::error!(error = %kind, "scan failed");
                self.enter(RunState::ScanFailed);
                return Err(e.raise(ErrorKind::Scan));
            },
        };
        self.enter(RunState::ScanComplete);
        for skipped in &report.skipped {
            self.emit(Event::ScanWarning(skipped.clone()));
        }

        self.enter(RunState::Mapping);
        let generator = self.generator.clone();
        let cancel = self.cancel.clone();
        let mapped = tokio::task::spawn_blocking(move || {
            let proposals = generator.generate(
                &report.root,
                &mut |p| {
                    let _ = events.send(Event::Mapping(p));
                },
                &cancel,
            );
            (report, proposals)
        })
        .await;
        let (report, proposals) = match mapped {
            Ok((report, proposals)) => (report, proposals),
            Err(e) => {
                self.enter(RunState::MappingFailedPartial);
                return Err(e).or_raise(|| ErrorKind::Terminated);
            },
        };
        let proposals = match proposals {
            Ok(proposals) => proposals,
            Err(e) if matches!(&*e, MappingErrorKind::Cancelled) => {
                self.enter(RunState::Cancelled);
                return Err(e.raise(ErrorKind::Cancelled));
            },
            Err(e) => {
                self.enter(RunState::MappingFailedPartial);
                return Err(e.raise(ErrorKind::Mapping));
            },
        };
        let failed = proposals.iter().filter(|p| p.status() == Status::Error).count();
        if failed > 0 {
            self.enter(RunState::MappingFailedPartial);
        }
        tracing::info!(proposals = proposals.len(), failed, skipped = report.skipped.len(), "run complete");
        self.enter(RunState::Done);
        Ok(Normalization {
            scan: report,
            proposals,
            generator: self.generator,
        })
    }
}

/// A run in progress.
pub struct NormalizationJob {
    events: mpsc::UnboundedReceiver<Event>,
    state: watch::Receiver<RunState>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<Normalization>>,
}
impl NormalizationJob {
    /// Asks the run to stop. It ends in [`RunState::Cancelled`] unless it had
    /// already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The next progress event, or `None` once the run has finished and every
    /// event has been received.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    pub fn state(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Waits for the run to finish. Events not yet received are discarded.
    pub async fn wait(self) -> Result<Normalization> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(e).or_raise(|| ErrorKind::Terminated),
        }
    }

    /// Waits for the run to finish, passing every event to `on_event`.
    pub async fn wait_with(mut self, mut on_event: impl FnMut(Event)) -> Result<Normalization> {
        while let Some(event) = self.events.recv().await {
            on_event(event);
        }
        self.wait().await
    }
}

/// The outcome of a finished run.
///
/// Holds the configuration snapshot the run was started with, so tag edits
/// are resolved against the same rules that produced the proposals.
#[derive(Debug)]
pub struct Normalization {
    scan: ScanReport,
    proposals: Vec<Proposal>,
    generator: MappingGenerator,
}
impl Normalization {
    pub fn scan(&self) -> &ScanReport {
        &self.scan
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.id() == id)
    }

    pub fn generator(&self) -> &MappingGenerator {
        &self.generator
    }

    /// The destination `proposal` would get with `edits` applied to its tags.
    /// Changes nothing.
    pub fn recompute_destination(&self, proposal: &Proposal, edits: &TagEdits) -> MappingResult<PathBuf> {
        let tags = proposal.tags().with_edits(edits);
        Ok(self.generator.resolve(proposal.item(), &tags)?.destination)
    }

    /// Applies `edits` to a proposal and makes the recomputed destination its
    /// own, marking it [`Status::Manual`]. Refused if another proposal
    /// already claims that destination.
    pub fn commit(&mut self, id: ProposalId, edits: &TagEdits) -> MappingResult<&Proposal> {
        let Some(index) = self.proposals.iter().position(|p| p.id() == id) else {
            exn::bail!(MappingErrorKind::UnknownProposal(id));
        };
        let proposal = &self.proposals[index];
        let tags = proposal.tags().with_edits(edits);
        let resolution = self.generator.resolve(proposal.item(), &tags)?;
        let collision = self
            .proposals
            .iter()
            .find(|p| p.id() != id && p.destination() == Some(resolution.destination.as_path()));
        if let Some(other) = collision {
            exn::bail!(MappingErrorKind::Collision(other.id()));
        }
        tracing::debug!(%id, destination = %resolution.destination.display(), "proposal committed");
        let proposal = &mut self.proposals[index];
        proposal.commit(tags, resolution);
        Ok(proposal)
    }

    /// Source/destination pairs for every settled proposal.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.proposals.iter().filter_map(Proposal::transfer).collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Proposal> + '_ {
        self.proposals.iter().filter(|p| p.status() == Status::Error)
    }
}
