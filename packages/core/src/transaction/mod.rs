//! Transactions
//!
//! - [`Transaction`] - staged writes, identity and rollback listeners of one unit of work
//! - [`RollbackListener`] - callback run after a transaction rolls back
//! - [`TransactionCoordinator`] - runs work in new transactions, retries commit
//!   conflicts and dispatches rollback listeners

mod context;
mod coordinator;

pub(crate) use context::StagedWrite;
pub use context::{RollbackListener, Transaction, TransactionStatus};
pub use coordinator::TransactionCoordinator;
