//! Augur Domain Model
//!
//! Core domain types and contracts for the hypothesis evaluation engine.
//! This crate has zero infrastructure dependencies and defines:
//! - Hypothesis, Evidence, Episode and Outcome entities
//! - The confidence updater and band classifier
//! - Trait interfaces for storage and external collaborators
//!
//! # Key Concepts
//!
//! - **Hypothesis**: a tracked claim about an entity with confidence and evidentiary history
//! - **Evidence**: one immutable observation that moved a hypothesis's confidence
//! - **Band**: discrete confidence tier derived purely from the confidence score
//! - **Episode**: a bi-temporally valid historical fact about an entity

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod band;
pub mod cluster;
pub mod confidence;
pub mod episode;
pub mod evidence;
pub mod hypothesis;
pub mod id;
pub mod lease;
pub mod outcome;
pub mod signal;
pub mod traits;

pub use band::{AdvisoryFlag, Band, BandThresholds, RetirementPolicy, ThresholdError};
pub use cluster::Cluster;
pub use episode::{effective_timeline, EffectiveEpisode, Episode};
pub use evidence::{source_types, Evidence, Observation, Polarity};
pub use hypothesis::{Hypothesis, HypothesisParts, HypothesisStatus, TransitionError};
pub use id::{EpisodeId, EvidenceId, HypothesisId};
pub use lease::{CycleLease, LeaseOutcome};
pub use outcome::{AnomalyRecord, Outcome, OutcomeRecord};
pub use signal::Signal;
