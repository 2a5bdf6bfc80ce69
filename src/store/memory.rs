use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{RecordStore, StoreError};
use crate::model::{Record, RecordFields, RecordId};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: i64,
}

/// In-process table with identity ids, same contract as the hosted one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds rows as if they had been inserted in order.
    pub fn with_rows(rows: Vec<RecordFields>) -> Self {
        let mut table = Table::default();
        for fields in rows {
            table.next_id += 1;
            table.rows.push(fields.into_record(RecordId::Int(table.next_id)));
        }
        Self {
            table: Mutex::new(table),
        }
    }

    /// Seeds rows that already carry ids; later inserts continue after the
    /// highest integer id.
    pub fn with_records(rows: Vec<Record>) -> Self {
        let next_id = rows
            .iter()
            .filter_map(|r| match r.id {
                RecordId::Int(n) => Some(n),
                RecordId::Text(_) => None,
            })
            .max()
            .unwrap_or(0);
        Self {
            table: Mutex::new(Table { rows, next_id }),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.table.lock().await.rows.clone())
    }

    async fn insert(&self, fields: &RecordFields) -> Result<Record, StoreError> {
        let mut table = self.table.lock().await;
        table.next_id += 1;
        let record = fields.clone().into_record(RecordId::Int(table.next_id));
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &RecordId, fields: &RecordFields) -> Result<Record, StoreError> {
        let mut table = self.table.lock().await;
        let row = table
            .rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        *row = fields.clone().into_record(id.clone());
        Ok(row.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut table = self.table.lock().await;
        table.rows.retain(|r| &r.id != id);
        Ok(())
    }
}
