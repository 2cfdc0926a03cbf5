pub mod btree;
pub mod buffer;
pub mod command;
pub mod config;
pub mod file;
pub mod record;
pub mod recovery;
pub mod storage;
pub mod wal;

pub use btree::{BTree, BTreeError, BTreeKey, BTreeResult, MAX_KEY, Page};
pub use buffer::{BufferError, BufferPool, BufferResult, PageTable};
pub use command::{Command, CommandError, CommandResult, Output, Session};
pub use config::{Config, ConfigError, ConfigResult};
pub use file::{BlockId, BlockNumber, FileError, FileManager, FileResult, PAGE_SIZE};
pub use record::{Column, DataType, RecordError, RecordResult, Schema, Value};
pub use recovery::{
    RecoveryError, RecoveryManager, RecoveryResult, RedoSummary, Transaction, TxnState,
};
pub use storage::{Storage, StorageError, StorageResult, UpdateInfo};
pub use wal::{Log, LogManager, LogType, Lsn, TxnId, WalError, WalResult};
