use super::Lsn;
use super::error::{WalError, WalResult};
use super::log_record::Log;
use crate::file::{BlockNumber, PAGE_SIZE};

/// One block of the log file: `[block_num u32][is_full u8][num_logs u32][records...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPage {
    block_num: BlockNumber,
    is_full: bool,
    logs: Vec<Log>,
    /// Bytes used by the header and the records so far
    used: usize,
}

impl LogPage {
    const HEADER_SIZE: usize = 9;

    pub fn new(block_num: BlockNumber) -> Self {
        Self {
            block_num,
            is_full: false,
            logs: Vec::new(),
            used: Self::HEADER_SIZE,
        }
    }

    pub fn block_num(&self) -> BlockNumber {
        self.block_num
    }

    /// Whether the page was closed and a later block continues the log
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    pub fn mark_full(&mut self) {
        self.is_full = true;
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Largest LSN on this page
    pub fn max_lsn(&self) -> Option<Lsn> {
        self.logs.iter().map(|log| log.lsn).max()
    }

    /// Whether `log` still fits on this page
    pub fn fits(&self, log: &Log) -> bool {
        !self.is_full && self.used + log.encoded_len() <= PAGE_SIZE
    }

    /// Largest record an empty page can take
    pub fn capacity() -> usize {
        PAGE_SIZE - Self::HEADER_SIZE
    }

    pub fn append(&mut self, log: Log) -> WalResult<()> {
        if !self.fits(&log) {
            return Err(WalError::PageFull);
        }
        self.used += log.encoded_len();
        self.logs.push(log);
        Ok(())
    }

    /// Serialize into a full block; unused space is zero
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_SIZE);
        buf.extend_from_slice(&self.block_num.to_le_bytes());
        buf.push(self.is_full as u8);
        buf.extend_from_slice(&(self.logs.len() as u32).to_le_bytes());
        for log in &self.logs {
            log.serialize_into(&mut buf);
        }
        buf.resize(PAGE_SIZE, 0);
        buf
    }

    pub fn deserialize(data: &[u8]) -> WalResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(WalError::CorruptedLog(format!(
                "Log page of {} bytes, expected {}",
                data.len(),
                PAGE_SIZE
            )));
        }

        let block_num = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let is_full = match data[4] {
            0 => false,
            1 => true,
            other => {
                return Err(WalError::CorruptedLog(format!("Invalid full flag: {}", other)));
            }
        };
        let num_logs = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;

        let mut offset = Self::HEADER_SIZE;
        let mut logs = Vec::new();
        for _ in 0..num_logs {
            let (log, len) = Log::deserialize(&data[offset..])?;
            offset += len;
            logs.push(log);
        }

        Ok(Self {
            block_num,
            is_full,
            logs,
            used: offset,
        })
    }
}
