//! Augur Analytics
//!
//! Read-only population views over committed engine state:
//! - Band distribution of ACTIVE hypotheses
//! - Cluster health (hypotheses without a cluster grouped as `unclustered`)
//! - Category performance with ROI tiers
//! - Lifecycle funnel
//! - Evidence impact per source type
//!
//! Every report is `serde`-serializable.
//!
//! # Usage
//!
//! ```no_run
//! use augur_analytics::PopulationAnalytics;
//! use augur_domain::BandThresholds;
//! use augur_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new("augur.db", BandThresholds::default())?;
//! let report = PopulationAnalytics::new().report(&store)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod bands;
mod categories;
mod clusters;
mod error;
mod funnel;
mod impact;
mod report;

pub use bands::{band_distribution, BandDistribution, BandShare};
pub use categories::{category_performance, CategoryPerformance, RoiTier};
pub use clusters::{cluster_health, ClusterHealth, UNCLUSTERED};
pub use error::AnalyticsError;
pub use funnel::{lifecycle_funnel, LifecycleFunnel};
pub use impact::{evidence_impact, EvidenceImpact};
pub use report::{PopulationAnalytics, PopulationReport};
