//! Transactions and redo-only crash recovery on top of the write-ahead log
//!
//! Updates are applied in place immediately and logged with their after
//! image. Aborting a transaction writes an ABORT record and nothing else:
//! its changes stay in memory, recovery simply never replays them.

mod error;
mod recovery_manager;
mod transaction;


pub use error::{RecoveryError, RecoveryResult};
pub use recovery_manager::{RecoveryManager, RedoSummary};
pub use transaction::{Transaction, TxnState};
