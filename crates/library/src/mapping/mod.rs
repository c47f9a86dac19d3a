//! Destination mapping.
//!
//! A [`MappingGenerator`] extracts tags from every scanned item, matches them
//! against a profile's rules and renders a destination, producing one
//! [`Proposal`] per file or sequence. Failures are per item: an item that
//! can't be mapped becomes a [`Status::Error`] proposal and the pass moves on.

pub mod error;
mod generator;
mod proposal;

pub use self::generator::{MappingGenerator, MappingProgress, resolve_collisions};
pub use self::proposal::{Proposal, ProposalId, Resolution, Status, Transfer};
