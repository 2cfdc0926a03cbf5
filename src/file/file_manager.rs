use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::error::{FileError, FileResult};
use super::{BlockId, BlockNumber, PAGE_SIZE};

/// Reads and writes fixed-size blocks of the files inside one directory.
///
/// Files are created on first use and kept open for the manager's lifetime.
pub struct FileManager {
    /// Directory holding every managed file
    dir: PathBuf,
    /// Map from file names to open files
    open_files: HashMap<String, File>,
}

impl FileManager {
    /// Create a file manager rooted at `dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> FileResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            open_files: HashMap::new(),
        })
    }

    /// Directory this manager works in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check whether `file_name` exists and holds at least one block
    pub fn exists(&self, file_name: &str) -> bool {
        std::fs::metadata(self.dir.join(file_name))
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    fn file(&mut self, file_name: &str) -> FileResult<&mut File> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(FileError::InvalidFileName(file_name.to_string()));
        }

        if !self.open_files.contains_key(file_name) {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(self.dir.join(file_name))?;
            self.open_files.insert(file_name.to_string(), file);
        }

        self.open_files
            .get_mut(file_name)
            .ok_or_else(|| FileError::InvalidFileName(file_name.to_string()))
    }

    /// Read a block.
    ///
    /// Returns the number of bytes actually present on disk together with a
    /// full block buffer. Zero bytes read means the block does not exist yet;
    /// the missing tail of a short read is zero-filled.
    pub fn read(&mut self, block: &BlockId) -> FileResult<(usize, Vec<u8>)> {
        let file = self.file(block.file_name())?;
        let mut buffer = vec![0u8; PAGE_SIZE];

        file.seek(SeekFrom::Start(block.number() as u64 * PAGE_SIZE as u64))?;

        let mut bytes_read = 0;
        while bytes_read < PAGE_SIZE {
            match file.read(&mut buffer[bytes_read..]) {
                Ok(0) => break,
                Ok(n) => bytes_read += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok((bytes_read, buffer))
    }

    /// Write a full block, extending the file if necessary
    pub fn write(&mut self, block: &BlockId, data: &[u8]) -> FileResult<()> {
        if data.len() != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }

        let file = self.file(block.file_name())?;
        let offset = block.number() as u64 * PAGE_SIZE as u64;
        let required_size = offset + PAGE_SIZE as u64;

        if file.metadata()?.len() < required_size {
            file.set_len(required_size)?;
        }

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        debug!("wrote block {}", block);
        Ok(())
    }

    /// Number of blocks in a file
    pub fn block_count(&mut self, file_name: &str) -> FileResult<BlockNumber> {
        let file = self.file(file_name)?;
        let size = file.metadata()?.len();
        Ok(size.div_ceil(PAGE_SIZE as u64) as BlockNumber)
    }

    /// Read the last block of a file.
    ///
    /// An empty file reports block 0 with zero bytes read.
    pub fn read_last_block(
        &mut self,
        file_name: &str,
    ) -> FileResult<(BlockNumber, usize, Vec<u8>)> {
        let count = self.block_count(file_name)?;
        let number = count.saturating_sub(1);
        let (bytes_read, data) = self.read(&BlockId::new(file_name, number))?;
        Ok((number, bytes_read, data))
    }

    /// Sync all open files to disk
    pub fn sync_all(&mut self) -> FileResult<()> {
        for file in self.open_files.values_mut() {
            file.sync_data()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_env() -> (TempDir, FileManager) {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();
        (temp_dir, manager)
    }

    #[test]
    fn test_read_write_block() {
        let (_temp_dir, mut manager) = setup_test_env();
        let block = BlockId::new("test.db", 0);

        let mut data = vec![0u8; PAGE_SIZE];
        data[0] = 42;
        data[100] = 99;
        data[PAGE_SIZE - 1] = 255;
        manager.write(&block, &data).unwrap();

        let (n, read) = manager.read(&block).unwrap();
        assert_eq!(n, PAGE_SIZE);
        assert_eq!(read, data);
    }

    #[test]
    fn test_read_missing_block_is_eof() {
        let (_temp_dir, mut manager) = setup_test_env();

        let (n, data) = manager.read(&BlockId::new("test.db", 100)).unwrap();
        assert_eq!(n, 0);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_invalid_size() {
        let (_temp_dir, mut manager) = setup_test_env();

        let result = manager.write(&BlockId::new("test.db", 0), &[1, 2, 3]);
        assert!(matches!(
            result,
            Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_block_count_and_last_block() {
        let (_temp_dir, mut manager) = setup_test_env();
        assert_eq!(manager.block_count("log").unwrap(), 0);

        let (number, n, _) = manager.read_last_block("log").unwrap();
        assert_eq!((number, n), (0, 0));

        let mut data = vec![0u8; PAGE_SIZE];
        data[0] = 7;
        manager.write(&BlockId::new("log", 3), &data).unwrap();
        assert_eq!(manager.block_count("log").unwrap(), 4);

        let (number, n, last) = manager.read_last_block("log").unwrap();
        assert_eq!(number, 3);
        assert_eq!(n, PAGE_SIZE);
        assert_eq!(last[0], 7);
    }

    #[test]
    fn test_exists() {
        let (_temp_dir, mut manager) = setup_test_env();
        assert!(!manager.exists("storage.db"));

        manager
            .write(&BlockId::new("storage.db", 0), &vec![0u8; PAGE_SIZE])
            .unwrap();
        assert!(manager.exists("storage.db"));
    }

    #[test]
    fn test_invalid_file_name() {
        let (_temp_dir, mut manager) = setup_test_env();

        let result = manager.read(&BlockId::new("../escape", 0));
        assert!(matches!(result, Err(FileError::InvalidFileName(_))));
    }
}
