use std::fmt;

use super::error::{WalError, WalResult};
use super::{Lsn, TxnId};
use crate::storage::UpdateInfo;

/// Kind of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogType {
    Begin = 0,
    Update = 1,
    Abort = 2,
    Commit = 3,
}

impl TryFrom<u32> for LogType {
    type Error = WalError;

    fn try_from(value: u32) -> WalResult<Self> {
        match value {
            0 => Ok(LogType::Begin),
            1 => Ok(LogType::Update),
            2 => Ok(LogType::Abort),
            3 => Ok(LogType::Commit),
            other => Err(WalError::UnknownLogType(other)),
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogType::Begin => "BEGIN",
            LogType::Update => "UPDATE",
            LogType::Abort => "ABORT",
            LogType::Commit => "COMMIT",
        };
        write!(f, "{}", name)
    }
}

/// Payload of a log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogBody {
    Begin,
    Update(UpdateInfo),
    Abort,
    Commit,
}

/// One log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub txn_id: TxnId,
    pub lsn: Lsn,
    pub body: LogBody,
}

/// `[len][txn_id][lsn][log_type]`
const FIXED_SIZE: usize = 16;

impl Log {
    pub fn log_type(&self) -> LogType {
        match self.body {
            LogBody::Begin => LogType::Begin,
            LogBody::Update(_) => LogType::Update,
            LogBody::Abort => LogType::Abort,
            LogBody::Commit => LogType::Commit,
        }
    }

    pub fn update_info(&self) -> Option<&UpdateInfo> {
        match &self.body {
            LogBody::Update(info) => Some(info),
            _ => None,
        }
    }

    /// Encoded size, including the leading length field
    pub fn encoded_len(&self) -> usize {
        FIXED_SIZE
            + match &self.body {
                LogBody::Update(info) => 4 * 5 + info.before.len() + info.after.len(),
                _ => 0,
            }
    }

    /// Append `[len][txn_id][lsn][log_type]` and, for updates,
    /// `[page_idx][ptr_idx][col_num][before_len][before][after_len][after]`
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.encoded_len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.txn_id.to_le_bytes());
        buf.extend_from_slice(&self.lsn.to_le_bytes());
        buf.extend_from_slice(&(self.log_type() as u32).to_le_bytes());

        if let LogBody::Update(info) = &self.body {
            buf.extend_from_slice(&info.page_idx.to_le_bytes());
            buf.extend_from_slice(&info.ptr_idx.to_le_bytes());
            buf.extend_from_slice(&info.col_num.to_le_bytes());
            buf.extend_from_slice(&(info.before.len() as u32).to_le_bytes());
            buf.extend_from_slice(&info.before);
            buf.extend_from_slice(&(info.after.len() as u32).to_le_bytes());
            buf.extend_from_slice(&info.after);
        }
    }

    /// Decode one record from the start of `data`.
    /// Returns the record and the number of bytes it occupied.
    pub fn deserialize(data: &[u8]) -> WalResult<(Self, usize)> {
        let mut reader = Reader { data, offset: 0 };
        let len = reader.u32()? as usize;
        if len < FIXED_SIZE || len > data.len() {
            return Err(WalError::CorruptedLog(format!(
                "Record length {} with {} bytes available",
                len,
                data.len()
            )));
        }

        let txn_id = reader.u32()?;
        let lsn = reader.u32()?;
        let body = match LogType::try_from(reader.u32()?)? {
            LogType::Begin => LogBody::Begin,
            LogType::Abort => LogBody::Abort,
            LogType::Commit => LogBody::Commit,
            LogType::Update => {
                let page_idx = reader.u32()?;
                let ptr_idx = reader.u32()?;
                let col_num = reader.u32()?;
                let before_len = reader.u32()? as usize;
                let before = reader.bytes(before_len)?.to_vec();
                let after_len = reader.u32()? as usize;
                let after = reader.bytes(after_len)?.to_vec();
                LogBody::Update(UpdateInfo {
                    page_idx,
                    ptr_idx,
                    col_num,
                    before,
                    after,
                })
            }
        };

        if reader.offset != len {
            return Err(WalError::CorruptedLog(format!(
                "Record declares {} bytes but holds {}",
                len, reader.offset
            )));
        }

        Ok((Self { txn_id, lsn, body }, len))
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} txn={} lsn={}", self.log_type(), self.txn_id, self.lsn)?;
        if let LogBody::Update(info) = &self.body {
            write!(
                f,
                " page={} slot={} col={} {:?} -> {:?}",
                info.page_idx, info.ptr_idx, info.col_num, info.before, info.after
            )?;
        }
        write!(f, ">")
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> WalResult<&'a [u8]> {
        let bytes = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or_else(|| {
                WalError::CorruptedLog(format!("Truncated record at byte {}", self.offset))
            })?;
        self.offset += len;
        Ok(bytes)
    }

    fn u32(&mut self) -> WalResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
