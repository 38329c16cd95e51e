use ledger_document::{DocumentState, Value};
use serde_json::json;

use crate::helpers::{TABLE, seed, snapshot, test_ledger};

#[tokio::test]
async fn unsaved_document_has_no_history() {
    let ledger = test_ledger();
    let doc = ledger.document(TABLE).await.unwrap();
    assert!(doc.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn revisions_are_ordered_oldest_first() {
    let ledger = test_ledger();
    let mut doc = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"id": "abc", "team": "X"})))
        .await
        .unwrap();
    doc.save().await.unwrap();
    doc.set("team", "Y").unwrap();
    doc.save().await.unwrap();
    doc.set("team", "Z").unwrap();
    doc.save().await.unwrap();

    let history = doc.history().await.unwrap();
    let versions: Vec<u64> = history.iter().map(|rev| rev.metadata.version).collect();
    assert_eq!(versions, vec![0, 1, 2]);

    let teams: Vec<&str> = history
        .iter()
        .filter_map(|rev| rev.document.get("team").and_then(Value::as_str))
        .collect();
    assert_eq!(teams, vec!["X", "Y", "Z"]);

    for rev in &history {
        assert_eq!(rev.document.id(), "abc");
        assert_eq!(rev.document.meta_id(), doc.meta_id());
        assert_eq!(rev.document.state(), DocumentState::Persisted);
        assert_eq!(Some(rev.metadata.id.as_str()), doc.meta_id());
        assert!(rev.metadata.tx_time.is_some());
    }
}

#[tokio::test]
async fn history_is_scoped_to_one_document() {
    let ledger = test_ledger();
    seed(
        &ledger,
        vec![json!({"name": "Ada"}), json!({"name": "Brian"})],
    )
    .await;

    let mut doc = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"name": "Chen"})))
        .await
        .unwrap();
    doc.save().await.unwrap();
    assert_eq!(doc.history().await.unwrap().len(), 1);

    let everything = ledger.query(TABLE).history(None).await.unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn loaded_document_history_after_save() {
    let ledger = test_ledger();
    let ids = seed(&ledger, vec![json!({"team": "X"})]).await;

    // Loading by id does not learn the link id; a save does.
    let mut loaded = ledger.load(TABLE, ids[0].as_str()).await.unwrap();
    assert!(loaded.history().await.unwrap().is_empty());

    loaded.set("team", "Y").unwrap();
    loaded.save().await.unwrap();
    let history = loaded.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].document.get("team").and_then(Value::as_str),
        Some("X")
    );
}

#[tokio::test]
async fn history_by_id_needs_no_link() {
    let ledger = test_ledger();
    let ids = seed(
        &ledger,
        vec![json!({"team": "X"}), json!({"team": "Other"})],
    )
    .await;

    let mut loaded = ledger.load(TABLE, ids[0].as_str()).await.unwrap();
    loaded.set("team", "Y").unwrap();
    loaded.save().await.unwrap();

    let history = ledger.query(TABLE).history_by_id(&ids[0]).await.unwrap();
    let teams: Vec<&str> = history
        .iter()
        .filter_map(|rev| rev.document.get("team").and_then(Value::as_str))
        .collect();
    assert_eq!(teams, vec!["X", "Y"]);
    assert!(ledger
        .query(TABLE)
        .history_by_id("missing")
        .await
        .unwrap()
        .is_empty());
}
