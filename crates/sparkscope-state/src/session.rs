//! Run-scoped ingest session.
//!
//! Walkers stage every row of an ingestion run here. The session writes
//! nothing until [`IngestSession::commit`], which applies all staged rows in
//! one redb write transaction. Dropping the session, or any commit error,
//! leaves the store exactly as it was.

use std::collections::BTreeMap;

use redb::{ReadableTable, TableDefinition, WriteTransaction};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::store::{StateStore, map_err};
use crate::tables::Record;

type StagedRows = BTreeMap<String, Vec<u8>>;

pub struct IngestSession {
    store: StateStore,
    staged: BTreeMap<&'static str, StagedRows>,
}

impl IngestSession {
    pub(crate) fn new(store: StateStore) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    /// Stage one row. Each key may be staged once per run.
    pub fn add<T: Record>(&mut self, record: &T) -> StateResult<()> {
        let table = T::NAME;
        let key = record.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let rows = self.staged.entry(table).or_default();
        if rows.contains_key(&key) {
            return Err(StateError::Duplicate { table, key });
        }
        rows.insert(key, value);
        Ok(())
    }

    /// Whether a row with this key has been staged in this run.
    pub fn contains<T: Record>(&self, key: &str) -> bool {
        self.staged
            .get(T::NAME)
            .is_some_and(|rows| rows.contains_key(key))
    }

    /// Rows staged for `T`'s table.
    pub fn staged_count<T: Record>(&self) -> usize {
        self.staged.get(T::NAME).map_or(0, BTreeMap::len)
    }

    /// Rows staged across all tables.
    pub fn len(&self) -> usize {
        self.staged.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every staged row in one transaction. Returns the row count.
    ///
    /// Rows are insert-only: a key already present in the store aborts the
    /// whole commit with [`StateError::Conflict`].
    pub fn commit(self) -> StateResult<usize> {
        let txn = self
            .store
            .database()
            .begin_write()
            .map_err(map_err!(Transaction))?;
        let written = match write_rows(&txn, &self.staged) {
            Ok(written) => written,
            Err(e) => {
                if let Err(abort) = txn.abort() {
                    warn!(error = %abort, "failed to abort ingest transaction");
                }
                return Err(e);
            }
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(rows = written, tables = self.staged.len(), "ingest session committed");
        Ok(written)
    }

    /// Discard every staged row.
    pub fn rollback(self) {
        debug!(rows = self.len(), "ingest session rolled back");
    }
}

fn write_rows(
    txn: &WriteTransaction,
    staged: &BTreeMap<&'static str, StagedRows>,
) -> StateResult<usize> {
    let mut written = 0;
    for (&name, rows) in staged {
        let definition: TableDefinition<&str, &[u8]> = TableDefinition::new(name);
        let mut table = txn.open_table(definition).map_err(map_err!(Table))?;
        for (key, value) in rows {
            if table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::Conflict {
                    table: name,
                    key: key.clone(),
                });
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            written += 1;
        }
    }
    Ok(written)
}
