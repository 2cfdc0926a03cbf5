//! Write-ahead log: typed records packed into block-sized log pages
//!
//! LSNs start at 1; 0 means "nothing logged/flushed yet". Pages are appended
//! in block order and the current page is rewritten in place on every force.

mod error;
mod log_record;
mod log_manager;
mod log_page;

pub use error::{WalError, WalResult};
pub use log_record::{Log, LogBody, LogType};
pub use log_manager::{LogIter, LogManager};
pub use log_page::LogPage;

/// Log sequence number
pub type Lsn = u32;

/// Transaction identifier
pub type TxnId = u32;
