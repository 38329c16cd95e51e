use ledger_document::statement::StatementKind;
use ledger_document::{LedgerError, LedgerGateway, Value};
use serde_json::json;

use crate::helpers::{TABLE, kinds, seed, snapshot, test_ledger};

fn people() -> Vec<serde_json::Value> {
    vec![
        json!({"name": "Ada", "team": "InnoLab", "floor": 1}),
        json!({"name": "Brian", "team": "Laboratory", "floor": 2}),
        json!({"name": "Chen", "team": "InnoLab", "floor": 3, "desk": {"row": 4}}),
    ]
}

#[tokio::test]
async fn find_by_returns_matching_documents_in_one_round_trip() {
    let ledger = test_ledger();
    let ids = seed(&ledger, people()).await;
    ledger.gateway().clear_journal();

    let found = ledger
        .query(TABLE)
        .find_by([("team", "InnoLab")])
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    let found_ids: Vec<&str> = found.iter().map(|doc| doc.id()).collect();
    assert_eq!(found_ids, vec![ids[0].as_str(), ids[2].as_str()]);
    assert_eq!(
        found[1].get_path(&["desk", "row"]).and_then(Value::as_i64),
        Some(4)
    );

    let journal = ledger.gateway().journal();
    assert_eq!(kinds(&journal), vec![StatementKind::Select]);
    assert_eq!(journal[0].text, "SELECT * FROM people WHERE team = ?");
}

#[tokio::test]
async fn find_by_combines_fields() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;

    let found = ledger
        .query(TABLE)
        .find_by([("team", Value::from("InnoLab")), ("floor", Value::from(3))])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name").and_then(Value::as_str), Some("Chen"));
}

#[tokio::test]
async fn find_by_without_match_is_empty() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;

    let found = ledger
        .query(TABLE)
        .find_by([("team", "Nobody")])
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn empty_filters_are_rejected() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;
    ledger.gateway().clear_journal();
    let query = ledger.query(TABLE);

    let err = query.find_by(Vec::<(&str, &str)>::new()).await.unwrap_err();
    assert!(matches!(err, LedgerError::EmptyFilter));

    let err = query
        .find_in(Vec::<(&str, Vec<i64>)>::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::EmptyFilter));

    let err = query
        .find_like(Vec::<(&str, &str)>::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::EmptyFilter));

    assert!(ledger.gateway().journal().is_empty());
}

#[tokio::test]
async fn find_in_matches_any_listed_value() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;
    ledger.gateway().clear_journal();

    let found = ledger
        .query(TABLE)
        .find_in([("floor", vec![2, 3])])
        .await
        .unwrap();
    let names: Vec<&str> = found
        .iter()
        .filter_map(|doc| doc.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["Brian", "Chen"]);

    let journal = ledger.gateway().journal();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].text, "SELECT * FROM people WHERE floor IN (?,?)");
}

#[tokio::test]
async fn find_in_rejects_empty_value_list() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;

    let err = ledger
        .query(TABLE)
        .find_in([("floor", Vec::<i64>::new())])
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidFilter(_)));
}

#[tokio::test]
async fn find_like_matches_substrings() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;

    let found = ledger
        .query(TABLE)
        .find_like([("team", "Lab")])
        .await
        .unwrap();
    assert_eq!(found.len(), 3);

    let found = ledger
        .query(TABLE)
        .find_like([("team", "Labor")])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name").and_then(Value::as_str), Some("Brian"));
}

#[tokio::test]
async fn all_returns_every_document() {
    let ledger = test_ledger();
    let ids = seed(&ledger, people()).await;

    let all = ledger.query(TABLE).all().await.unwrap();
    let all_ids: Vec<String> = all.iter().map(|doc| doc.id().to_string()).collect();
    assert_eq!(all_ids, ids);
    assert!(all.iter().all(|doc| doc.table() == TABLE));
}

#[tokio::test]
async fn query_results_can_be_saved() {
    let ledger = test_ledger();
    seed(&ledger, people()).await;

    let mut found = ledger
        .query(TABLE)
        .find_by([("name", "Brian")])
        .await
        .unwrap();
    let mut brian = found.remove(0);
    brian.set("team", "InnoLab").unwrap();
    brian.save().await.unwrap();

    let found = ledger
        .query(TABLE)
        .find_by([("team", "InnoLab")])
        .await
        .unwrap();
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn query_on_unknown_table_fails() {
    let ledger = test_ledger();
    let err = ledger.query("ghosts").all().await.unwrap_err();
    assert!(matches!(err, LedgerError::Gateway(_)));
}

#[tokio::test]
async fn rows_with_unusable_identity_are_still_returned() {
    let ledger = test_ledger();
    seed(&ledger, vec![json!({"id": "ok", "team": "X"})]).await;
    ledger
        .gateway()
        .insert(TABLE, &snapshot(json!({"id": null, "team": "X"})))
        .await
        .unwrap();

    let all = ledger.query(TABLE).all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].id(), "null");
    assert_eq!(all[1].snapshot().get("id"), Some(&json!(null)));

    let found = ledger.query(TABLE).find_by([("team", "X")]).await.unwrap();
    assert_eq!(found.len(), 2);

    let history = ledger.query(TABLE).history(None).await.unwrap();
    assert_eq!(history.len(), 2);
}
