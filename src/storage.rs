//! RocksDB storage layer backing the persistent ledger

use crate::{
    config::{CompressionType, StorageConfig},
    errors::{StorageError, TuplausResult},
};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::{path::Path, sync::Arc};

#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<DB>,
}

impl LedgerStorage {
    /// Open with default tuning at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rocksdb::Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn new_with_config(config: &StorageConfig) -> TuplausResult<Self> {
        if config.clear_on_start && Path::new(&config.data_directory).exists() {
            tracing::warn!(path = %config.data_directory, "Clearing ledger database on start");
            std::fs::remove_dir_all(&config.data_directory)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_max_write_buffer_number(config.max_write_buffer_number as i32);
        opts.set_compression_type(match config.compression_type {
            CompressionType::None => rocksdb::DBCompressionType::None,
            CompressionType::Snappy => rocksdb::DBCompressionType::Snappy,
            CompressionType::Lz4 => rocksdb::DBCompressionType::Lz4,
            CompressionType::Zstd => rocksdb::DBCompressionType::Zstd,
        });

        let db = DB::open(&opts, &config.data_directory).map_err(|e| {
            StorageError::DatabaseOpenFailed(format!("{}: {}", config.data_directory, e))
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, rocksdb::Error> {
        self.db.get(key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error> {
        self.db.put(key, value)
    }

    /// Apply all items in one atomic write
    pub fn batch_write<K, V>(&self, items: &[(K, V)]) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut batch = WriteBatch::default();
        for (key, value) in items {
            batch.put(key, value);
        }
        self.db.write(batch)
    }

    /// Ascending scan of keys starting with `prefix`
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, rocksdb::Error> {
        let mut rows = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }

    /// Greatest key under `prefix`, used to recover sequence counters
    pub fn last_key_with_prefix(&self, prefix: &[u8]) -> Result<Option<Vec<u8>>, rocksdb::Error> {
        let mut upper = prefix.to_vec();
        upper.push(0xff);
        for item in self.db.iterator(IteratorMode::From(&upper, Direction::Reverse)) {
            let (key, _) = item?;
            if key.starts_with(prefix) {
                return Ok(Some(key.to_vec()));
            }
            if key.as_ref() < prefix {
                break;
            }
        }
        Ok(None)
    }

    /// Delete every key under `prefix` in one batch
    pub fn delete_prefix(&self, prefix: &[u8]) -> Result<usize, rocksdb::Error> {
        let mut batch = WriteBatch::default();
        let mut count = 0;
        for (key, _) in self.scan_prefix(prefix)? {
            batch.delete(key);
            count += 1;
        }
        self.db.write(batch)?;
        Ok(count)
    }

    /// Atomic write of a prepared batch
    pub fn write(&self, batch: WriteBatch) -> Result<(), rocksdb::Error> {
        self.db.write(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_prefix_stops_at_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LedgerStorage::new(dir.path()).unwrap();
        storage
            .batch_write(&[
                (b"event:1".to_vec(), b"a".to_vec()),
                (b"event:2".to_vec(), b"b".to_vec()),
                (b"player:1".to_vec(), b"c".to_vec()),
            ])
            .unwrap();

        let rows = storage.scan_prefix(b"event:").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1, b"b".to_vec());
    }

    #[test]
    fn test_last_key_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LedgerStorage::new(dir.path()).unwrap();
        assert_eq!(storage.last_key_with_prefix(b"event:").unwrap(), None);

        storage.put(b"event:\x00\x01", b"").unwrap();
        storage.put(b"event:\x00\x07", b"").unwrap();
        storage.put(b"zzz", b"").unwrap();

        assert_eq!(
            storage.last_key_with_prefix(b"event:").unwrap(),
            Some(b"event:\x00\x07".to_vec())
        );
    }

    #[test]
    fn test_delete_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LedgerStorage::new(dir.path()).unwrap();
        storage.put(b"player:1", b"x").unwrap();
        storage.put(b"player:2", b"y").unwrap();
        storage.put(b"meta:next", b"z").unwrap();

        assert_eq!(storage.delete_prefix(b"player:").unwrap(), 2);
        assert!(storage.get(b"player:1").unwrap().is_none());
        assert!(storage.get(b"meta:next").unwrap().is_some());
    }
}
