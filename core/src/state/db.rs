use anyhow::{Context, Result};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use shieldpool_privacy::{Commitment, Nullifier};
use std::path::Path;
use std::sync::Arc;

const CF_COMMITMENTS: &str = "commitments";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_META: &str = "meta";

const KEY_NEXT_SEQUENCE: &[u8] = b"next_sequence";

/// Durable copy of the commitment list and nullifier set.
///
/// Keys are big-endian so iteration order is leaf order.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Open (or create) the store at `path` with all column families present
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_COMMITMENTS, CF_NULLIFIERS, CF_META]
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), families)
            .with_context(|| format!("failed to open RocksDB at {}", path.as_ref().display()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("column family {name} missing"))
    }

    pub fn nullifier_exists(&self, nullifier: &Nullifier) -> Result<bool> {
        Ok(self
            .db
            .get_cf(self.cf(CF_NULLIFIERS)?, nullifier.as_bytes())?
            .is_some())
    }

    pub fn get_commitment(&self, leaf_index: u64) -> Result<Option<Commitment>> {
        self.db
            .get_cf(self.cf(CF_COMMITMENTS)?, leaf_index.to_be_bytes())?
            .map(|bytes| hash_from(&bytes, "commitment").map(Commitment))
            .transpose()
    }

    /// Every persisted commitment, in leaf order
    pub fn get_all_commitments(&self) -> Result<Vec<(u64, Commitment)>> {
        self.db
            .iterator_cf(self.cf(CF_COMMITMENTS)?, IteratorMode::Start)
            .map(|item| -> Result<(u64, Commitment)> {
                let (key, value) = item?;
                let key: [u8; 8] = key
                    .as_ref()
                    .try_into()
                    .context("leaf index key is not 8 bytes")?;
                Ok((u64::from_be_bytes(key), Commitment(hash_from(&value, "commitment")?)))
            })
            .collect()
    }

    pub fn get_all_nullifiers(&self) -> Result<Vec<Nullifier>> {
        self.db
            .iterator_cf(self.cf(CF_NULLIFIERS)?, IteratorMode::Start)
            .map(|item| -> Result<Nullifier> {
                let (key, _) = item?;
                Ok(Nullifier(hash_from(&key, "nullifier")?))
            })
            .collect()
    }

    /// Sequence of the next receipt to apply (0 for a fresh database)
    pub fn next_sequence(&self) -> Result<u64> {
        match self.db.get_cf(self.cf(CF_META)?, KEY_NEXT_SEQUENCE)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .context("next_sequence is not 8 bytes")?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Write one receipt's leaves, nullifiers and the new sequence in a
    /// single `WriteBatch`
    pub fn apply_batch(&self, operations: DbBatch) -> Result<()> {
        let commitments = self.cf(CF_COMMITMENTS)?;
        let nullifiers = self.cf(CF_NULLIFIERS)?;
        let meta = self.cf(CF_META)?;

        let mut batch = WriteBatch::default();
        for (leaf_index, commitment) in &operations.commitments {
            batch.put_cf(commitments, leaf_index.to_be_bytes(), commitment.as_bytes());
        }
        for nullifier in &operations.nullifiers {
            batch.put_cf(nullifiers, nullifier.as_bytes(), b"");
        }
        batch.put_cf(meta, KEY_NEXT_SEQUENCE, operations.next_sequence.to_be_bytes());

        self.db
            .write(batch)
            .context("failed to commit receipt batch")
    }
}

fn hash_from(bytes: &[u8], what: &str) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .with_context(|| format!("stored {what} is {} bytes, expected 32", bytes.len()))
}

/// Batch of database operations for atomic commit
#[derive(Debug, Default)]
pub struct DbBatch {
    pub commitments: Vec<(u64, Commitment)>,
    pub nullifiers: Vec<Nullifier>,
    pub next_sequence: u64,
}
