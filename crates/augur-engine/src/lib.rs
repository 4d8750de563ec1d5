//! Augur Engine
//!
//! The hypothesis evaluation engine: decides which hypothesis to investigate
//! next, how far new evidence moves its confidence, and when it is mature
//! enough to act on.
//!
//! # Overview
//!
//! - **Signal intake**: attaches a signal to the ACTIVE hypothesis for its
//!   entity and category, or seeds a new one
//! - **EIG prioritizer**: ranks ACTIVE hypotheses by expected information gain
//! - **Pass orchestrator**: runs single-flight cycles of
//!   `SELECTING → ENRICHING → UPDATING` under a wall-clock budget
//! - **Enrichment**: queries the knowledge graph, web search and the reasoning
//!   judge with per-call timeouts and bounded retries
//! - **Outcome recorder**: writes terminal outcomes and feeds them back into
//!   the information value estimates
//!
//! # Architecture
//!
//! Cycles are guarded by a persisted lease (`pass-orchestrator`) with an owner
//! token and expiry, so two processes sharing a database never run
//! overlapping cycles. A second start is rejected with
//! [`EngineError::CapacityExceeded`], never queued.
//!
//! Every hypothesis update is one compare-and-set transaction. A lost race is
//! retried once with fresh state, then deferred to the next pass.
//!
//! ## Pass lifecycle
//!
//! | State | Work | Leaves to |
//! |-------|------|-----------|
//! | **Selecting** | Top-K by EIG with passes left | Enriching, or Done when empty |
//! | **Enriching** | Concurrent collaborator calls, nothing written | Updating, or Done on budget expiry |
//! | **Updating** | Evidence, confidence, band, pass count, status | Selecting |
//!
//! # Usage
//!
//! ```no_run
//! use augur_domain::Signal;
//! use augur_engine::{Engine, EngineConfig};
//! use augur_providers::{MockGraph, MockProvider, MockSearch};
//! use augur_store::SqliteStore;
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let store = SqliteStore::new("augur.db", config.thresholds()?)?;
//! let engine = Engine::new(
//!     Arc::new(Mutex::new(store)),
//!     Arc::new(MockProvider::default()),
//!     Arc::new(MockGraph::new()),
//!     Arc::new(MockSearch::new()),
//!     config,
//! )?;
//!
//! engine
//!     .ingest_signal(Signal::new("org:acme", "procurement", "Tender notice published", 1_709_251_200))
//!     .await?;
//! let report = engine.run_cycle().await?;
//! println!("{} passes, {} updates", report.passes, report.hypotheses_updated);
//! println!("{}", engine.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use augur_engine::EngineConfig;
//!
//! // Default: 4 passes, top 10, 5 minute budget
//! let config = EngineConfig::default();
//!
//! // Aggressive: top 25, 2 second calls, 2 minute budget
//! let config = EngineConfig::aggressive();
//!
//! // Lenient: 6 passes, 15 second calls, 15 minute budget
//! let config = EngineConfig::lenient();
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [engine]
//! informed = 0.30
//! confident = 0.60
//! conviction = 0.80
//! max_passes = 4
//! top_k = 10
//! call_timeout_ms = 5000
//! cycle_budget_secs = 300
//! escalation_delta = 0.5
//!
//! [engine.source_information_values]
//! signal = 0.3
//! knowledge_graph = 0.4
//! web_search = 0.5
//! ```

#![warn(missing_docs)]

mod clock;
mod config;
mod engine;
mod enrichment;
mod error;
mod feedback;
mod intake;
mod judge;
mod metrics;
mod outcome;
mod prioritizer;
mod temporal;
mod text;
mod worker;

pub use clock::Clock;
pub use config::EngineConfig;
pub use engine::{CycleReport, Engine, PassState, StopReason, ORCHESTRATOR_LEASE};
pub use enrichment::{call_collaborator, CallPolicy, CallStats, Enricher, Enrichment, EnrichmentRequest};
pub use error::EngineError;
pub use feedback::{EvidenceStat, InformationValueSnapshot};
pub use intake::SignalReceipt;
pub use judge::{parse_judgment, Judgment, PromptBuilder, JUDGMENT_SCHEMA};
pub use metrics::EngineMetrics;
pub use prioritizer::{Candidate, EigPrioritizer, EvidenceSummary, Priority, ReservedBoosts};
pub use temporal::{TemporalContext, TemporalContextProvider};
pub use worker::EngineWorker;
