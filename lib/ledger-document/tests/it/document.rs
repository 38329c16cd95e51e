use ledger_document::statement::StatementKind;
use ledger_document::{
    DocumentState, InMemoryLedger, Ledger, LedgerConfig, LedgerError, LedgerGateway,
    RESERVED_FIELDS, Strut, Value,
};
use serde_json::json;

use crate::helpers::{ForgetfulLedger, TABLE, kinds, snapshot, test_ledger};

#[tokio::test]
async fn new_document_has_generated_id_and_no_fields() {
    let ledger = test_ledger();
    let doc = ledger.document(TABLE).await.unwrap();

    assert!(!doc.id().is_empty());
    assert!(!doc.id().contains('-'));
    assert_eq!(doc.table(), TABLE);
    assert_eq!(doc.ledger(), "test");
    assert_eq!(doc.index(), "id");
    assert_eq!(doc.meta_id(), None);
    assert_eq!(doc.state(), DocumentState::New);

    let fields = doc.fields();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("id"), Some(&Value::from(doc.id())));
}

#[tokio::test]
async fn generated_ids_are_distinct() {
    let ledger = test_ledger();
    let a = ledger.document(TABLE).await.unwrap();
    let b = ledger.document(TABLE).await.unwrap();
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn first_use_provisions_table_and_index() {
    let ledger = test_ledger();
    ledger.document(TABLE).await.unwrap();

    let journal = ledger.gateway().journal();
    assert_eq!(
        kinds(&journal),
        vec![StatementKind::CreateTable, StatementKind::CreateIndex]
    );
    assert_eq!(journal[0].text, "CREATE TABLE people");
    assert_eq!(journal[1].text, "CREATE INDEX ON people (id)");
    assert!(ledger.gateway().indexes(TABLE).contains("id"));

    // Second use finds the table listed and provisions nothing.
    ledger.gateway().clear_journal();
    ledger.document(TABLE).await.unwrap();
    assert!(ledger.gateway().journal().is_empty());
}

#[tokio::test]
async fn custom_index_field_is_provisioned_and_used() {
    let ledger = Ledger::new(
        InMemoryLedger::new(),
        LedgerConfig::new("test").with_index_field("sku"),
    );
    let doc = ledger
        .document_from_snapshot("items", &snapshot(json!({"sku": "A-1", "name": "bolt"})))
        .await
        .unwrap();

    assert_eq!(doc.id(), "A-1");
    assert_eq!(doc.index(), "sku");
    assert!(doc.get("sku").is_none());
    assert_eq!(doc.snapshot().get("sku"), Some(&json!("A-1")));
    assert!(ledger.gateway().indexes("items").contains("sku"));
}

#[tokio::test]
async fn snapshot_fields_are_nested() {
    let ledger = test_ledger();
    let doc = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"id": "abc", "a": {"b": {"c": 5}}})))
        .await
        .unwrap();

    assert_eq!(doc.id(), "abc");
    assert_eq!(doc.get_path(&["a", "b", "c"]), Some(&Value::Int(5)));

    let a = doc.get("a").and_then(Value::as_nested).unwrap();
    let b = a.get("b").and_then(Value::as_nested).unwrap();
    assert_eq!(b.get("c").and_then(Value::as_i64), Some(5));

    // Snapshot construction never reads the ledger.
    let journal = ledger.gateway().journal();
    assert!(!kinds(&journal).contains(&StatementKind::Select));
}

#[tokio::test]
async fn snapshot_without_id_generates_one() {
    let ledger = test_ledger();
    let doc = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"team": "X"})))
        .await
        .unwrap();
    assert!(!doc.id().is_empty());
    assert_eq!(doc.get("team").and_then(Value::as_str), Some("X"));
}

#[tokio::test]
async fn non_scalar_identity_is_rejected() {
    let ledger = test_ledger();
    let err = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"id": {"nested": true}})))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidIdentity(_)));
}

#[tokio::test]
async fn reserved_fields_never_surface() {
    let ledger = test_ledger();
    let mut doc = ledger
        .document_from_snapshot(
            TABLE,
            &snapshot(json!({
                "id": "abc",
                "table": "elsewhere",
                "ledger": "other",
                "index": "nope",
                "meta_id": "forged",
                "strands": [1, 2],
                "team": "X"
            })),
        )
        .await
        .unwrap();

    assert_eq!(doc.table(), TABLE);
    assert_eq!(doc.meta_id(), None);
    for name in RESERVED_FIELDS {
        assert!(!doc.fields().contains_key(name), "{} leaked", name);
        assert!(matches!(
            doc.set(*name, "x"),
            Err(LedgerError::ReservedField(_))
        ));
    }

    doc.save().await.unwrap();
    for name in RESERVED_FIELDS {
        assert!(!doc.fields().contains_key(name), "{} leaked after save", name);
    }
    let keys: Vec<String> = doc.fields().keys().cloned().collect();
    assert_eq!(keys, vec!["id", "team"]);
}

#[tokio::test]
async fn with_metadata_exposes_hidden_fields() {
    let ledger = test_ledger();
    let mut doc = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"id": "abc"})))
        .await
        .unwrap();
    doc.save().await.unwrap();

    let full = doc.with_metadata();
    assert_eq!(full.get("table"), Some(&json!("people")));
    assert_eq!(full.get("ledger"), Some(&json!("test")));
    assert_eq!(full.get("index"), Some(&json!("id")));
    assert_eq!(full.get("meta_id"), Some(&json!(doc.meta_id().unwrap())));
}

#[tokio::test]
async fn exists_flips_after_save() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();
    doc.set("team", "X").unwrap();

    let id = doc.id().to_string();
    assert!(!doc.exists(&id).await.unwrap());

    let receipt = doc.save().await.unwrap();
    assert!(doc.exists(&id).await.unwrap());
    assert_eq!(doc.meta_id(), Some(receipt.document_id.as_str()));
    assert_eq!(doc.state(), DocumentState::Persisted);
}

#[tokio::test]
async fn saves_check_existence_then_write() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();
    ledger.gateway().clear_journal();

    doc.save().await.unwrap();
    assert_eq!(
        kinds(&ledger.gateway().journal()),
        vec![StatementKind::Select, StatementKind::Insert]
    );

    ledger.gateway().clear_journal();
    doc.set("team", "X").unwrap();
    assert_eq!(doc.state(), DocumentState::Dirty);
    doc.save().await.unwrap();
    doc.save().await.unwrap();

    let journal = ledger.gateway().journal();
    assert_eq!(
        kinds(&journal),
        vec![
            StatementKind::Select,
            StatementKind::Update,
            StatementKind::Select,
            StatementKind::Update,
        ]
    );
    assert_eq!(journal[1].text, "UPDATE people AS p SET p = ? WHERE id = ?");
    assert_eq!(journal[1].params[1], json!(doc.id()));
}

#[tokio::test]
async fn save_keeps_meta_id_stable() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();
    let first = doc.save().await.unwrap();
    doc.set("team", "Y").unwrap();
    let second = doc.save().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn load_by_id_reads_stored_fields() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();
    doc.set("team", "X").unwrap();
    doc.set("address", {
        let mut address = Strut::new();
        address.set("city", "Oslo");
        address
    })
    .unwrap();
    doc.save().await.unwrap();

    let loaded = ledger.load(TABLE, doc.id()).await.unwrap();
    assert_eq!(loaded.id(), doc.id());
    assert_eq!(loaded.fields(), doc.fields());
    assert_eq!(
        loaded.get_path(&["address", "city"]).and_then(Value::as_str),
        Some("Oslo")
    );
}

#[tokio::test]
async fn load_missing_id_yields_empty_document() {
    let ledger = test_ledger();
    let doc = ledger.load(TABLE, "missing").await.unwrap();
    assert_eq!(doc.id(), "missing");
    assert_eq!(doc.fields().len(), 1);
    assert_eq!(doc.state(), DocumentState::New);
}

#[tokio::test]
async fn changing_index_field_changes_identity() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();
    let previous = doc.set("id", "renamed").unwrap();
    assert!(previous.is_some());
    assert_eq!(doc.id(), "renamed");

    assert!(matches!(
        doc.set("id", Value::Null),
        Err(LedgerError::InvalidIdentity(_))
    ));
}

#[tokio::test]
async fn nested_fields_can_be_edited_in_place() {
    let ledger = test_ledger();
    let mut doc = ledger
        .document_from_snapshot(TABLE, &snapshot(json!({"id": "abc", "a": {"b": {"c": 5}}})))
        .await
        .unwrap();
    doc.save().await.unwrap();

    doc.nested_mut(&["a", "b"]).unwrap().set("c", 6);
    assert_eq!(doc.state(), DocumentState::Dirty);
    doc.save().await.unwrap();

    let loaded = ledger.load(TABLE, "abc").await.unwrap();
    assert_eq!(loaded.get_path(&["a", "b", "c"]), Some(&Value::Int(6)));
}

#[tokio::test]
async fn provisioning_failure_is_not_fatal() {
    let ledger = Ledger::new(ForgetfulLedger::default(), LedgerConfig::new("test"));
    ledger.document(TABLE).await.unwrap();

    // The table is never listed, so the second use provisions again and the
    // backend rejects it. The index step is skipped after the failure.
    ledger.gateway().inner.clear_journal();
    let mut doc = ledger.document(TABLE).await.unwrap();
    assert_eq!(
        kinds(&ledger.gateway().inner.journal()),
        vec![StatementKind::CreateTable]
    );

    doc.set("team", "X").unwrap();
    doc.save().await.unwrap();
    assert!(doc.meta_id().is_some());
}

#[tokio::test]
async fn write_failure_propagates() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();
    ledger.gateway().fail_writes(true);

    let err = doc.save().await.unwrap_err();
    assert!(matches!(err, LedgerError::Write(_)));
    assert_eq!(doc.meta_id(), None);
    assert_eq!(doc.state(), DocumentState::New);
}

#[tokio::test]
async fn root_struct_is_not_reachable_through_nested_mut() {
    let ledger = test_ledger();
    let mut doc = ledger.document(TABLE).await.unwrap();

    assert!(doc.nested_mut::<&str>(&[]).is_none());
    assert!(doc.nested_mut(&["absent"]).is_none());
    assert_eq!(doc.state(), DocumentState::New);

    doc.set("meta", Strut::new()).unwrap();
    doc.nested_mut(&["meta"]).unwrap().set("table", "elsewhere");
    doc.save().await.unwrap();

    let keys: Vec<String> = doc.fields().keys().cloned().collect();
    assert_eq!(keys, vec!["id".to_string(), "meta".to_string()]);
    let rows = ledger.gateway().select_all(TABLE).await.unwrap();
    assert_eq!(rows[0].get("meta"), Some(&json!({"table": "elsewhere"})));
    assert!(rows[0].get("table").is_none());
    assert!(rows[0].get("meta_id").is_none());
}

#[tokio::test]
async fn numeric_identity_is_updated_in_place() {
    let ledger = test_ledger();
    ledger.document(TABLE).await.unwrap();
    ledger
        .gateway()
        .insert(TABLE, &snapshot(json!({"id": 7, "team": "X"})))
        .await
        .unwrap();

    let mut docs = ledger.query(TABLE).all().await.unwrap();
    assert_eq!(docs.len(), 1);
    let mut doc = docs.remove(0);
    assert_eq!(doc.id(), "7");
    assert_eq!(doc.snapshot().get("id"), Some(&json!(7)));

    doc.set("team", "Y").unwrap();
    doc.save().await.unwrap();

    let rows = ledger.gateway().select_all(TABLE).await.unwrap();
    assert_eq!(rows, vec![snapshot(json!({"id": 7, "team": "Y"}))]);
}

#[tokio::test]
async fn deeply_nested_snapshot_is_accepted() {
    let ledger = test_ledger();
    let mut plain = json!({"leaf": true});
    for level in 0..100 {
        plain = json!({ format!("l{level}"): plain });
    }
    let mut row = snapshot(plain);
    row.insert("id".into(), json!("deep"));

    let mut doc = ledger.document_from_snapshot(TABLE, &row).await.unwrap();
    assert_eq!(doc.snapshot(), row);
    doc.save().await.unwrap();

    let loaded = ledger.load(TABLE, "deep").await.unwrap();
    assert_eq!(loaded.snapshot(), row);
}

#[tokio::test]
async fn table_names_are_matched_after_sanitizing() {
    let ledger = test_ledger();
    ledger.document("peo'ple").await.unwrap();
    assert_eq!(
        kinds(&ledger.gateway().journal()),
        vec![StatementKind::CreateTable, StatementKind::CreateIndex]
    );

    ledger.gateway().clear_journal();
    let mut doc = ledger.document("peo'ple").await.unwrap();
    assert!(ledger.gateway().journal().is_empty());

    doc.save().await.unwrap();
    assert_eq!(ledger.query("people").all().await.unwrap().len(), 1);
}
