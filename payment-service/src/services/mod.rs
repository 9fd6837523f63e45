pub mod database;
pub mod metrics;
pub mod tron;
pub mod verification;

pub use database::{Database, ReconciliationResult};
pub use metrics::{get_metrics, init_metrics};
pub use tron::TronClient;
pub use verification::{
    ChainOracle, HeuristicMatcher, TransferMatcher, VerificationOutcome, VerificationService,
};
