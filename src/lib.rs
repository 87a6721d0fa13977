pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod scheduler;
pub mod settlement;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    ContributionTransfer, Decimal, Distribution, Draw, DrawStatus, Identity, SenderTotal, TimeMs,
    TxHash,
};
pub use error::AppError;
pub use ledger::{HttpLedgerClient, LedgerClient, LedgerError, MockLedger};
pub use settlement::{
    Aggregator, DistributionEngine, LifecycleManager, SettlementRunner,
};
