mod common;

use common::{INDEX, recording_queue};
use futures::future::BoxFuture;
use kodegen_tools_indexsync::search::client::{BulkEntry, BulkOperation};
use kodegen_tools_indexsync::search::reindex::SourceRecord;
use kodegen_tools_indexsync::{
    CollectionFilter, RecordHooks, RecordSource, Reindexer, SyncConfig, SyncError,
};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Serialize)]
struct Facility {
    id: u32,
    name: String,
}

struct MemorySource {
    collections: Vec<(String, Vec<SourceRecord>)>,
}

impl MemorySource {
    fn new() -> Self {
        let record = |id: &str| SourceRecord {
            id: id.to_string(),
            document: json!({ "id": id }).as_object().cloned().unwrap_or_default(),
        };
        Self {
            collections: vec![
                ("Facility".to_string(), vec![record("1"), record("2")]),
                ("Resource".to_string(), vec![record("10")]),
                ("SequelizeMeta".to_string(), vec![record("m1")]),
            ],
        }
    }
}

impl RecordSource for MemorySource {
    fn collections(&self) -> Vec<String> {
        self.collections.iter().map(|(name, _)| name.clone()).collect()
    }

    fn fetch_all<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, anyhow::Result<Vec<SourceRecord>>> {
        Box::pin(async move {
            self.collections
                .iter()
                .find(|(name, _)| name == collection)
                .map(|(_, records)| records.clone())
                .ok_or_else(|| anyhow::anyhow!("no such collection: {collection}"))
        })
    }
}

#[tokio::test(start_paused = true)]
async fn hooks_buffer_saves_and_destroys() {
    let (queue, client) = recording_queue();
    let hooks = RecordHooks::new(queue.clone(), INDEX, CollectionFilter::blacklist(["SequelizeMeta"]));

    let facility = Facility {
        id: 3,
        name: "North Clinic".to_string(),
    };
    assert!(hooks.after_save("Facility", facility.id, &facility));
    assert!(hooks.after_destroy("Facility", 4));
    assert!(!hooks.after_save("SequelizeMeta", 1, &json!({"name": "init"})));
    assert_eq!(queue.pending_len(), 2);

    sleep(Duration::from_millis(2100)).await;
    let bulks = client.bulks();
    assert_eq!(bulks.len(), 1);
    assert_eq!(
        bulks[0].directives(),
        vec![
            (BulkOperation::Index, "3".to_string()),
            (BulkOperation::Delete, "4".to_string()),
        ]
    );

    let directive = bulks[0].entries[0].as_directive().unwrap();
    assert_eq!(directive.target.index_name(), INDEX);
    assert_eq!(directive.target.collection_name(), "facility");
    match &bulks[0].entries[1] {
        BulkEntry::Body(body) => assert_eq!(body["name"], "North Clinic"),
        other => panic!("expected document body, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn hooks_skip_non_object_records() {
    let (queue, _client) = recording_queue();
    let hooks = RecordHooks::new(queue.clone(), INDEX, CollectionFilter::All);

    assert!(!hooks.after_save("Facility", 1, &json!([1, 2, 3])));
    assert!(!hooks.after_save("Facility", 2, "plain string"));
    assert_eq!(queue.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn hooks_follow_configured_whitelist() {
    let (queue, _client) = recording_queue();
    let config = SyncConfig::builder()
        .es_host("localhost:9200")
        .es_index("clinic_index")
        .whitelist(["Facility"])
        .build()
        .unwrap();
    let hooks = RecordHooks::from_config(queue, &config);

    assert_eq!(hooks.index_name(), "clinic_index");
    assert!(hooks.watches("facility"));
    assert!(!hooks.watches("Resource"));
}

#[tokio::test(start_paused = true)]
async fn reindex_resets_then_loads_each_collection() {
    let (queue, client) = recording_queue();
    let source = MemorySource::new();

    // Stale writes buffered before the re-index are superseded by it
    let hooks = RecordHooks::new(queue.clone(), INDEX, CollectionFilter::All);
    hooks.after_destroy("Facility", 99);

    let reports = Reindexer::new(&queue, &source, INDEX)
        .with_filter(CollectionFilter::blacklist(["SequelizeMeta"]))
        .run(&[])
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| report.is_success()));
    let facility = reports
        .iter()
        .find(|report| report.collection == "Facility")
        .unwrap();
    assert_eq!(facility.result.as_ref().unwrap().to_string(), "2/2");

    let calls = client.calls();
    assert_eq!(
        &calls[..3],
        &["exists app_index", "delete app_index", "create app_index"]
    );
    assert_eq!(client.bulk_count(), 2);

    sleep(Duration::from_secs(15)).await;
    assert_eq!(client.bulk_count(), 2, "buffered delete must have been discarded");
}

#[tokio::test(start_paused = true)]
async fn reindex_reports_collection_failures() {
    let (queue, client) = recording_queue();
    let source = MemorySource::new();

    let reports = Reindexer::new(&queue, &source, INDEX)
        .run(&["Resource".to_string(), "Missing".to_string()])
        .await
        .unwrap();

    let missing = reports
        .iter()
        .find(|report| report.collection == "Missing")
        .unwrap();
    assert!(!missing.is_success());
    assert!(matches!(
        missing.error(),
        Some(SyncError::Other(message)) if message.contains("no such collection: Missing")
    ));
    assert_eq!(client.bulk_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reindex_fails_when_reset_fails() {
    let (queue, client) = recording_queue();
    client.fail_index_ops(true);
    let source = MemorySource::new();

    let result = Reindexer::new(&queue, &source, INDEX).run(&[]).await;
    assert!(matches!(result, Err(SyncError::ResetFailed { .. })));
    assert_eq!(client.bulk_count(), 0);
}
