//! Command implementations.

pub mod episode;
pub mod hypotheses;
pub mod ingest;
pub mod init;
pub mod outcome;
pub mod report;
pub mod run;

pub use self::episode::execute_episode;
pub use self::hypotheses::execute_hypotheses;
pub use self::ingest::execute_ingest;
pub use self::init::execute_init;
pub use self::outcome::execute_outcome;
pub use self::report::execute_report;
pub use self::run::execute_run;
