use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::aggregate::{self, Totals};
use crate::model::{Record, RecordFields, RecordId, RecordPatch};
use crate::store::{MemoryStore, RecordStore, StoreError};
use crate::tracker::{DeleteOutcome, Tracker, TrackerError};

fn fields(product: &str, required: Option<i64>, done: Option<i64>) -> RecordFields {
    RecordFields {
        product: product.to_string(),
        required,
        done,
        date: NaiveDate::from_ymd_opt(2024, 5, 1),
    }
}

fn seed() -> Vec<RecordFields> {
    vec![
        fields("Tornillo", Some(10), Some(4)),
        fields("Tuerca", Some(5), Some(5)),
        fields("Arandela", None, Some(3)),
    ]
}

#[derive(Default)]
struct CallLog {
    failing: AtomicBool,
    mutations: AtomicUsize,
}

/// Memory store that counts mutating calls and can be switched to fail them.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    calls: Arc<CallLog>,
}

impl FlakyStore {
    fn new(rows: Vec<RecordFields>) -> (Self, Arc<CallLog>) {
        Self::over(Arc::new(MemoryStore::with_rows(rows)))
    }

    fn over(inner: Arc<MemoryStore>) -> (Self, Arc<CallLog>) {
        let calls = Arc::new(CallLog::default());
        (
            Self {
                inner,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        self.calls.mutations.fetch_add(1, Ordering::SeqCst);
        if self.calls.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Remote {
                operation,
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        self.inner.fetch_all().await
    }

    async fn insert(&self, fields: &RecordFields) -> Result<Record, StoreError> {
        self.check("insert")?;
        self.inner.insert(fields).await
    }

    async fn update(&self, id: &RecordId, fields: &RecordFields) -> Result<Record, StoreError> {
        self.check("update")?;
        self.inner.update(id, fields).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        self.check("delete")?;
        self.inner.delete(id).await
    }
}

async fn tracker_with_calls() -> (Tracker, Arc<CallLog>) {
    let (store, calls) = FlakyStore::new(seed());
    let tracker = Tracker::connect(Box::new(store)).await.unwrap();
    (tracker, calls)
}

fn products(records: &[&Record]) -> Vec<String> {
    records.iter().map(|r| r.product.clone()).collect()
}

#[tokio::test]
async fn load_computes_totals_over_snapshot() {
    let (tracker, _) = tracker_with_calls().await;
    let totals = tracker.totals();
    assert_eq!(totals.required, 15);
    assert_eq!(totals.done, 12);
    assert_eq!(totals.remaining, 3);
    assert_eq!(products(&tracker.completed()), vec!["Tuerca"]);
}

#[tokio::test]
async fn create_appends_and_refreshes_totals() {
    let (mut tracker, _) = tracker_with_calls().await;
    let created = tracker
        .create(fields("Clavo", Some(8), Some(8)))
        .await
        .unwrap();
    assert_eq!(created.id, RecordId::Int(4));
    assert_eq!(tracker.records().len(), 4);
    assert_eq!(tracker.totals().required, 23);
    assert_eq!(tracker.completed().len(), 2);
}

#[tokio::test]
async fn edit_moves_record_into_completed_set() {
    let (mut tracker, _) = tracker_with_calls().await;
    let patch = RecordPatch {
        done: Some(10),
        ..Default::default()
    };
    let updated = tracker.edit(&RecordId::Int(1), &patch).await.unwrap();
    assert!(updated.is_complete());
    assert_eq!(updated.date, NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(
        products(&tracker.completed()),
        vec!["Tornillo", "Tuerca"]
    );
    assert_eq!(tracker.totals().remaining, -3);
}

#[tokio::test]
async fn delete_order_does_not_change_result() {
    let (mut first, _) = tracker_with_calls().await;
    let (mut second, _) = tracker_with_calls().await;

    for id in [1, 3] {
        first.delete(&RecordId::Int(id), |_| true).await.unwrap();
    }
    for id in [3, 1] {
        second.delete(&RecordId::Int(id), |_| true).await.unwrap();
    }

    assert_eq!(first.records(), second.records());
    assert_eq!(first.totals(), second.totals());
    assert_eq!(first.totals().required, 5);
}

#[tokio::test]
async fn declined_delete_makes_no_remote_call() {
    let (mut tracker, calls) = tracker_with_calls().await;
    let outcome = tracker
        .delete(&RecordId::Int(2), |record| {
            assert_eq!(record.product, "Tuerca");
            false
        })
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(calls.mutations.load(Ordering::SeqCst), 0);
    assert_eq!(tracker.records().len(), 3);
}

#[tokio::test]
async fn unknown_id_is_rejected_locally() {
    let (mut tracker, calls) = tracker_with_calls().await;
    let err = tracker
        .delete(&RecordId::Int(99), |_| true)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::UnknownRecord { .. }));
    let patch = RecordPatch {
        done: Some(1),
        ..Default::default()
    };
    let err = tracker.edit(&RecordId::Int(99), &patch).await.unwrap_err();
    assert!(matches!(err, TrackerError::UnknownRecord { .. }));
    assert_eq!(calls.mutations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_calls_leave_state_untouched() {
    let (mut tracker, calls) = tracker_with_calls().await;
    let before = tracker.records().to_vec();
    let totals = tracker.totals();
    calls.failing.store(true, Ordering::SeqCst);

    assert!(matches!(
        tracker.create(fields("Clavo", Some(1), Some(0))).await,
        Err(TrackerError::Store(StoreError::Remote { status: 503, .. }))
    ));
    let patch = RecordPatch {
        done: Some(10),
        ..Default::default()
    };
    assert!(tracker.edit(&RecordId::Int(1), &patch).await.is_err());
    assert!(tracker.delete(&RecordId::Int(2), |_| true).await.is_err());

    assert_eq!(tracker.records(), before.as_slice());
    assert_eq!(tracker.totals(), totals);
}

#[tokio::test]
async fn invalid_fields_never_reach_the_store() {
    let (mut tracker, calls) = tracker_with_calls().await;
    let err = tracker.create(fields("  ", Some(1), Some(1))).await.unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
    let err = tracker
        .create(fields("Clavo", Some(-1), Some(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
    let err = tracker
        .edit(&RecordId::Int(1), &RecordPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::EmptyPatch { .. }));
    assert_eq!(calls.mutations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn search_runs_against_full_snapshot_after_update() {
    let (mut tracker, _) = tracker_with_calls().await;
    tracker.set_query("TUER");
    assert_eq!(products(&tracker.visible()), vec!["Tuerca"]);

    let patch = RecordPatch {
        product: Some("Tuerca M8".to_string()),
        ..Default::default()
    };
    tracker.edit(&RecordId::Int(2), &patch).await.unwrap();
    assert_eq!(products(&tracker.visible()), vec!["Tuerca M8"]);

    tracker.set_query("");
    assert_eq!(tracker.visible().len(), 3);
    assert_eq!(tracker.query(), "");
}

#[tokio::test]
async fn reload_replaces_snapshot() {
    let (mut tracker, _) = tracker_with_calls().await;
    tracker.delete(&RecordId::Int(1), |_| true).await.unwrap();
    tracker.load().await.unwrap();
    assert_eq!(tracker.records().len(), 2);
    assert!(tracker.record(&RecordId::Int(1)).is_none());
}

#[tokio::test]
async fn deleting_any_one_record_leaves_totals_of_the_other_two() {
    let expected = [
        (1, Totals { required: 5, done: 8, remaining: -3 }),
        (2, Totals { required: 10, done: 7, remaining: 3 }),
        (3, Totals { required: 15, done: 9, remaining: 6 }),
    ];
    for (id, totals) in expected {
        let (mut tracker, _) = tracker_with_calls().await;
        let outcome = tracker.delete(&RecordId::Int(id), |_| true).await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(ref r) if r.id == RecordId::Int(id)));
        assert_eq!(tracker.records().len(), 2);
        assert_eq!(tracker.totals(), aggregate::totals(tracker.records()));
        assert_eq!(tracker.totals(), totals, "after deleting {id}");
    }
}

#[tokio::test]
async fn update_of_row_missing_from_snapshot_is_appended() {
    let backing = Arc::new(MemoryStore::with_rows(seed()));
    let (store, _) = FlakyStore::over(backing.clone());
    let mut tracker = Tracker::connect(Box::new(store)).await.unwrap();

    let late = backing
        .insert(&fields("Clavo", Some(6), Some(1)))
        .await
        .unwrap();
    assert!(tracker.record(&late.id).is_none());

    let updated = tracker
        .update(&late.id, fields("Clavo", Some(6), Some(6)))
        .await
        .unwrap();
    assert_eq!(tracker.records().len(), 4);
    assert_eq!(tracker.records().last(), Some(&updated));
    assert_eq!(products(&tracker.completed()), vec!["Tuerca", "Clavo"]);
    assert_eq!(tracker.totals(), aggregate::totals(tracker.records()));
}

#[tokio::test]
async fn update_replaces_known_record_in_place() {
    let (mut tracker, _) = tracker_with_calls().await;
    let updated = tracker
        .update(&RecordId::Int(3), fields("Arandela", Some(3), Some(3)))
        .await
        .unwrap();
    assert_eq!(tracker.records().len(), 3);
    assert_eq!(tracker.records()[2], updated);
    assert_eq!(tracker.totals().remaining, 6);
}

#[tokio::test]
async fn typed_ids_resolve_against_stored_text_ids() {
    let stored = vec![
        fields("Tornillo", Some(2), Some(2)).into_record(RecordId::Text("007".to_string())),
        fields("Tuerca", Some(4), Some(1)).into_record(RecordId::Int(7)),
    ];
    let store = MemoryStore::with_records(stored);
    let mut tracker = Tracker::connect(Box::new(store)).await.unwrap();

    assert_eq!(tracker.resolve(" 007 "), RecordId::Text("007".to_string()));
    assert_eq!(tracker.resolve("7"), RecordId::Int(7));
    assert_eq!(tracker.resolve("42"), RecordId::Int(42));

    let id = tracker.resolve("007");
    let outcome = tracker.delete(&id, |_| true).await.unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted(ref r) if r.product == "Tornillo"));
    assert_eq!(products(&tracker.visible()), vec!["Tuerca"]);
}
