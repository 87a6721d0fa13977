//! Domain types for draws, distributions, and contribution transfers.

pub mod decimal;
pub mod distribution;
pub mod draw;
pub mod primitives;
pub mod transfer;

pub use decimal::Decimal;
pub use distribution::{Distribution, STATUS_ERROR};
pub use draw::{Draw, DrawStatus};
pub use primitives::{Identity, TimeMs, TxHash};
pub use transfer::{ContributionTransfer, SenderTotal};
