use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::{self, Totals};
use crate::filter;
use crate::model::{Record, RecordFields, RecordId, RecordPatch, ValidationError};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("record {id} is not in the working set")]
    UnknownRecord { id: RecordId },

    #[error("nothing to change for record {id}")]
    EmptyPatch { id: RecordId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(Record),
    Cancelled,
}

/// Owns the working set: the last full snapshot of the table, the current
/// search query and the totals derived from the snapshot.
///
/// The snapshot only changes after the store confirms a call, so a failed
/// call leaves every piece of state as it was.
pub struct Tracker {
    store: Box<dyn RecordStore>,
    snapshot: Vec<Record>,
    query: String,
    totals: Totals,
}

impl Tracker {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self {
            store,
            snapshot: Vec::new(),
            query: String::new(),
            totals: Totals::default(),
        }
    }

    /// Builds a tracker and loads the full table.
    pub async fn connect(store: Box<dyn RecordStore>) -> Result<Self, TrackerError> {
        let mut tracker = Self::new(store);
        tracker.load().await?;
        Ok(tracker)
    }

    pub async fn load(&mut self) -> Result<(), TrackerError> {
        let rows = self.store.fetch_all().await?;
        info!(count = rows.len(), "loaded working set");
        self.snapshot = rows;
        self.recompute();
        Ok(())
    }

    pub async fn create(&mut self, fields: RecordFields) -> Result<Record, TrackerError> {
        fields.validate()?;
        let created = self.store.insert(&fields).await?;
        info!(id = %created.id, producto = %created.product, "record created");
        self.snapshot.push(created.clone());
        self.recompute();
        Ok(created)
    }

    pub async fn update(
        &mut self,
        id: &RecordId,
        fields: RecordFields,
    ) -> Result<Record, TrackerError> {
        fields.validate()?;
        let updated = self.store.update(id, &fields).await?;
        info!(id = %updated.id, "record updated");
        match self.snapshot.iter_mut().find(|r| r.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => self.snapshot.push(updated.clone()),
        }
        self.recompute();
        Ok(updated)
    }

    /// Applies a partial edit on top of the record currently in the snapshot.
    pub async fn edit(&mut self, id: &RecordId, patch: &RecordPatch) -> Result<Record, TrackerError> {
        if patch.is_empty() {
            return Err(TrackerError::EmptyPatch { id: id.clone() });
        }
        let current = self
            .record(id)
            .ok_or_else(|| TrackerError::UnknownRecord { id: id.clone() })?;
        let fields = patch.apply(current);
        self.update(id, fields).await
    }

    /// Deletes after `confirm` approves the record; a declined confirmation
    /// issues no remote call.
    pub async fn delete<F>(&mut self, id: &RecordId, confirm: F) -> Result<DeleteOutcome, TrackerError>
    where
        F: FnOnce(&Record) -> bool,
    {
        let record = self
            .record(id)
            .cloned()
            .ok_or_else(|| TrackerError::UnknownRecord { id: id.clone() })?;
        if !confirm(&record) {
            debug!(%id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        self.store.delete(id).await?;
        info!(%id, "record deleted");
        self.snapshot.retain(|r| &r.id != id);
        self.recompute();
        Ok(DeleteOutcome::Deleted(record))
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The snapshot narrowed by the current query.
    pub fn visible(&self) -> Vec<&Record> {
        filter::search(&self.snapshot, &self.query)
    }

    pub fn records(&self) -> &[Record] {
        &self.snapshot
    }

    /// Maps a typed id onto the snapshot, matching the stored id's text form
    /// before falling back to `RecordId::parse`.
    pub fn resolve(&self, raw: &str) -> RecordId {
        let raw = raw.trim();
        self.snapshot
            .iter()
            .map(|r| &r.id)
            .find(|id| id.to_string() == raw)
            .cloned()
            .unwrap_or_else(|| RecordId::parse(raw))
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.snapshot.iter().find(|r| &r.id == id)
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn completed(&self) -> Vec<&Record> {
        aggregate::completed(&self.snapshot)
    }

    fn recompute(&mut self) {
        self.totals = aggregate::totals(&self.snapshot);
        debug!(
            required = self.totals.required,
            done = self.totals.done,
            remaining = self.totals.remaining,
            "totals recomputed"
        );
    }
}
