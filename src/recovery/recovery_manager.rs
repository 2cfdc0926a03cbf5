use ahash::{AHashMap, AHashSet};
use log::{debug, info};

use super::error::{RecoveryError, RecoveryResult};
use super::transaction::{Transaction, TxnState};
use crate::record::Value;
use crate::storage::{Storage, UpdateInfo};
use crate::wal::{Log, LogBody, LogManager, LogType, Lsn, TxnId};

/// Outcome of one redo pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedoSummary {
    /// Transactions that reached COMMIT
    pub winners: usize,
    /// UPDATE records replayed
    pub applied: usize,
    /// UPDATE records of transactions that never committed
    pub skipped: usize,
    /// Committed UPDATE records whose page already carried their LSN
    pub up_to_date: usize,
}

/// Writes the log on behalf of transactions and replays it after a crash.
pub struct RecoveryManager {
    log_manager: LogManager,
    states: AHashMap<TxnId, TxnState>,
    next_txn_id: TxnId,
}

impl RecoveryManager {
    /// Wrap a log manager; transaction ids continue after the largest one logged
    pub fn new(mut log_manager: LogManager) -> RecoveryResult<Self> {
        let next_txn_id = log_manager
            .iter()?
            .map(|log| log.txn_id)
            .max()
            .map_or(1, |id| id + 1);

        Ok(Self {
            log_manager,
            states: AHashMap::new(),
            next_txn_id,
        })
    }

    pub fn log_manager(&self) -> &LogManager {
        &self.log_manager
    }

    pub fn log_manager_mut(&mut self) -> &mut LogManager {
        &mut self.log_manager
    }

    /// Hand out a fresh transaction id
    pub fn new_transaction(&mut self) -> Transaction {
        let txn = Transaction::new(self.next_txn_id);
        self.next_txn_id += 1;
        txn
    }

    pub fn state(&self, txn: &Transaction) -> Option<TxnState> {
        self.states.get(&txn.id()).copied()
    }

    fn require_in_progress(&self, txn: &Transaction, action: &'static str) -> RecoveryResult<()> {
        match self.state(txn) {
            Some(TxnState::InProgress) => Ok(()),
            Some(state) => Err(RecoveryError::InvalidTransition {
                txn: txn.id(),
                state,
                action,
            }),
            None => Err(RecoveryError::UnknownTransaction(txn.id())),
        }
    }

    /// Log BEGIN
    pub fn begin(&mut self, txn: &Transaction) -> RecoveryResult<Lsn> {
        if let Some(state) = self.state(txn) {
            return Err(RecoveryError::InvalidTransition {
                txn: txn.id(),
                state,
                action: "begin",
            });
        }

        let log = self.log_manager.add_log(txn.id(), LogType::Begin)?;
        self.states.insert(txn.id(), TxnState::InProgress);
        Ok(log.lsn)
    }

    /// Log an update that was already applied and stamp its page with the record's LSN
    pub fn update(
        &mut self,
        storage: &mut Storage,
        txn: &Transaction,
        info: UpdateInfo,
    ) -> RecoveryResult<Lsn> {
        self.require_in_progress(txn, "update")?;

        let page_idx = info.page_idx;
        let log = self.log_manager.add_update(txn.id(), info)?;
        storage.set_page_lsn(page_idx, log.lsn)?;
        Ok(log.lsn)
    }

    /// Change one column of a row and log the change
    pub fn update_row(
        &mut self,
        storage: &mut Storage,
        txn: &Transaction,
        primary: &Value,
        column_name: &str,
        new_value: &Value,
    ) -> RecoveryResult<Lsn> {
        self.require_in_progress(txn, "update")?;
        let info = storage.update(primary, column_name, new_value)?;
        self.update(storage, txn, info)
    }

    /// Log COMMIT and force the log
    pub fn commit(&mut self, txn: &Transaction) -> RecoveryResult<Lsn> {
        self.require_in_progress(txn, "commit")?;

        let log = self.log_manager.add_log(txn.id(), LogType::Commit)?;
        self.log_manager.write_page()?;
        self.states.insert(txn.id(), TxnState::Committed);
        Ok(log.lsn)
    }

    /// Log ABORT. Changes already made stay where they are.
    pub fn abort(&mut self, txn: &Transaction) -> RecoveryResult<Lsn> {
        self.require_in_progress(txn, "abort")?;

        let log = self.log_manager.add_log(txn.id(), LogType::Abort)?;
        self.states.insert(txn.id(), TxnState::Aborted);
        Ok(log.lsn)
    }

    /// Replay the after images of every committed transaction, oldest first,
    /// then flush the storage.
    ///
    /// A record is replayed only when its page LSN is below the record's LSN.
    /// A page stamped at or past the record already holds the change, and its
    /// slots may have shifted since, so writing the after image again could
    /// land on a different row.
    pub fn log_redo(&mut self, storage: &mut Storage) -> RecoveryResult<RedoSummary> {
        let winners: AHashSet<TxnId> = self
            .log_manager
            .iter()?
            .filter(|log| log.log_type() == LogType::Commit)
            .map(|log| log.txn_id)
            .collect();

        let mut summary = RedoSummary {
            winners: winners.len(),
            ..RedoSummary::default()
        };

        for Log { txn_id, lsn, body } in self.log_manager.iter()? {
            let LogBody::Update(info) = body else {
                continue;
            };
            if !winners.contains(&txn_id) {
                debug!("redo: skipping lsn {} of txn {}", lsn, txn_id);
                summary.skipped += 1;
                continue;
            }

            if storage.page_lsn(info.page_idx)? >= lsn {
                debug!("redo: page {} already holds lsn {}", info.page_idx, lsn);
                summary.up_to_date += 1;
                continue;
            }

            storage.apply_update(&info)?;
            storage.set_page_lsn(info.page_idx, lsn)?;
            summary.applied += 1;
        }

        storage.flush()?;
        info!(
            "redo finished: {} winners, {} updates applied, {} up to date, {} skipped",
            summary.winners, summary.applied, summary.up_to_date, summary.skipped
        );
        Ok(summary)
    }
}
