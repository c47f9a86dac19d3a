//! Destination mapping and run orchestration for VFX production files.
//!
//! The [`Orchestrator`] ties the other crates together: it scans a source
//! tree with [`shotsort_scan`], then maps every file and sequence to a
//! destination using the tag patterns and profiles of a
//! [`PatternStore`](shotsort_config::PatternStore). Nothing here touches the
//! files themselves; the result is a list of [`Proposal`]s and the
//! [`Transfer`]s they imply.

mod display;
pub mod error;
pub mod mapping;
mod orchestrator;

pub use crate::display::{DisplayDetails, IconHint, display_details};
pub use crate::mapping::{MappingGenerator, MappingProgress, Proposal, ProposalId, Resolution, Status, Transfer};
pub use crate::orchestrator::{Event, Normalization, NormalizationJob, Orchestrator, RunState};
