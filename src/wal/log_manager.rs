use log::{debug, info};

use super::error::{WalError, WalResult};
use super::log_page::LogPage;
use super::log_record::{Log, LogBody, LogType};
use super::{Lsn, TxnId};
use crate::file::{BlockId, FileManager};
use crate::storage::UpdateInfo;

/// Appends records to the current log page and forces pages to the log file.
pub struct LogManager {
    file_manager: FileManager,
    file_name: String,
    page: LogPage,
    /// LSN the next record will get
    next_lsn: Lsn,
    /// Largest LSN known to be on disk
    flushed_lsn: Lsn,
}

impl LogManager {
    /// Open the log file, continuing after whatever it already holds.
    ///
    /// The last block becomes the current page unless it was closed as full.
    pub fn open(mut file_manager: FileManager, file_name: &str) -> WalResult<Self> {
        let (last_block, bytes_read, data) = file_manager.read_last_block(file_name)?;

        let (page, flushed_lsn) = if bytes_read == 0 {
            (LogPage::new(0), 0)
        } else {
            let mut flushed_lsn = 0;
            for number in 0..=last_block {
                let (_, data) = file_manager.read(&BlockId::new(file_name, number))?;
                if let Some(lsn) = LogPage::deserialize(&data)?.max_lsn() {
                    flushed_lsn = flushed_lsn.max(lsn);
                }
            }

            let last = LogPage::deserialize(&data)?;
            let page = if last.is_full() {
                LogPage::new(last_block + 1)
            } else {
                last
            };
            (page, flushed_lsn)
        };

        info!(
            "opened log {} at block {}, flushed lsn {}",
            file_name,
            page.block_num(),
            flushed_lsn
        );
        Ok(Self {
            file_manager,
            file_name: file_name.to_string(),
            page,
            next_lsn: flushed_lsn + 1,
            flushed_lsn,
        })
    }

    pub fn flushed_lsn(&self) -> Lsn {
        self.flushed_lsn
    }

    /// LSN the next appended record will get
    pub fn next_lsn(&self) -> Lsn {
        self.next_lsn
    }

    /// Page currently being appended to
    pub fn current_page(&self) -> &LogPage {
        &self.page
    }

    /// Append a BEGIN, ABORT or COMMIT record
    pub fn add_log(&mut self, txn_id: TxnId, log_type: LogType) -> WalResult<Log> {
        let body = match log_type {
            LogType::Begin => LogBody::Begin,
            LogType::Abort => LogBody::Abort,
            LogType::Commit => LogBody::Commit,
            LogType::Update => return Err(WalError::UpdateWithoutInfo),
        };
        self.append(txn_id, body)
    }

    /// Append an UPDATE record carrying both byte images
    pub fn add_update(&mut self, txn_id: TxnId, update_info: UpdateInfo) -> WalResult<Log> {
        self.append(txn_id, LogBody::Update(update_info))
    }

    fn append(&mut self, txn_id: TxnId, body: LogBody) -> WalResult<Log> {
        let log = Log {
            txn_id,
            lsn: self.next_lsn,
            body,
        };
        if log.encoded_len() > LogPage::capacity() {
            return Err(WalError::RecordTooLarge(log.encoded_len()));
        }

        if !self.page.fits(&log) {
            // Close this page for good and continue in the next block
            self.page.mark_full();
            self.write_page()?;
            self.page = LogPage::new(self.page.block_num() + 1);
        }

        self.page.append(log.clone())?;
        self.next_lsn += 1;
        debug!("appended {}", log);
        Ok(log)
    }

    /// Force the current page to disk
    pub fn write_page(&mut self) -> WalResult<()> {
        let block = BlockId::new(&self.file_name, self.page.block_num());
        self.file_manager.write(&block, &self.page.serialize())?;
        self.file_manager.sync_all()?;

        if let Some(lsn) = self.page.max_lsn() {
            self.flushed_lsn = self.flushed_lsn.max(lsn);
        }
        info!("forced log page {} up to lsn {}", block, self.flushed_lsn);
        Ok(())
    }

    /// Iterate every record, oldest first: closed pages from disk, then the
    /// current page including records not forced yet
    pub fn iter(&mut self) -> WalResult<LogIter> {
        let mut logs = Vec::new();
        for number in 0..self.page.block_num() {
            let (_, data) = self.file_manager.read(&BlockId::new(&self.file_name, number))?;
            logs.extend(LogPage::deserialize(&data)?.logs().iter().cloned());
        }
        logs.extend(self.page.logs().iter().cloned());
        Ok(LogIter {
            logs: logs.into_iter(),
        })
    }
}

/// Iterator over a snapshot of the log
pub struct LogIter {
    logs: std::vec::IntoIter<Log>,
}

impl Iterator for LogIter {
    type Item = Log;

    fn next(&mut self) -> Option<Self::Item> {
        self.logs.next()
    }
}
