/// Transaction tests
///
/// Rollback, nesting, observer failures and driving the aggregator from a
/// host other than the in-memory record.
/// Run with: cargo test --test transaction_tests

use netchanges::changes::{Attribute, AttributeSet};
use netchanges::core::Column;
use netchanges::prelude::*;
use netchanges::AggregatorPhase;
use std::sync::{Arc, Mutex};

fn test_models() -> Table {
    Table::new(TableSchema::new(
        "test_models",
        vec![
            Column::new("name", DataType::Text),
            Column::new("value", DataType::Text),
            Column::new("settings", DataType::Json),
        ],
    ))
}

fn text(s: &str) -> Value {
    Value::from(s)
}

#[test]
fn test_rollback_restores_row_and_attributes() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();
    let id = record.id().unwrap();

    let result: Result<()> = record.transaction(|r| {
        r.update([("name", "baz")])?;
        r.update([("value", "biz")])?;
        Err(ChangeError::Aborted("changed my mind".into()))
    });

    assert!(matches!(result, Err(ChangeError::Aborted(_))));
    assert!(!record.in_transaction());
    assert_eq!(record.get("name"), Some(&text("foo")));
    assert_eq!(record.get("value"), Some(&text("bar")));
    assert!(!record.has_changes_to_save());

    let stored = table.get(id).unwrap().unwrap();
    assert_eq!(stored[1], text("foo"));
    assert_eq!(stored[2], text("bar"));
}

#[test]
fn test_rollback_leaves_no_aggregated_view() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();

    let _ = record.transaction(|r| {
        r.update([("name", "baz")])?;
        r.update([("value", "biz")])?;
        Err::<(), _>(ChangeError::Aborted("nope".into()))
    });

    assert!(!record.aggregator().is_aggregated());
    assert_eq!(record.aggregator().phase(), AggregatorPhase::Idle);
    assert_eq!(record.aggregator().pending_saves(), 0);

    record
        .transaction(|r| {
            r.update([("name", "fub")])?;
            r.update([("value", "bap")])
        })
        .unwrap();

    assert_eq!(
        record.previous_change("name"),
        Some(&AttributeChange::new("foo", "fub"))
    );
    assert_eq!(
        record.previous_change("value"),
        Some(&AttributeChange::new("bar", "bap"))
    );
}

#[test]
fn test_empty_rollback_keeps_committed_aggregate() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();

    record
        .transaction(|r| {
            r.update([("name", "baz")])?;
            r.update([("value", "biz")])
        })
        .unwrap();
    let committed = record.saved_changes().clone();
    assert_eq!(committed.len(), 2);

    let result: Result<()> = record.transaction(|_| Err(ChangeError::Aborted("nothing saved".into())));

    assert!(result.is_err());
    assert!(record.aggregator().is_aggregated());
    assert_eq!(record.saved_changes(), &committed);
}

#[test]
fn test_rolled_back_save_is_not_reported() {
    let table = test_models();
    let created = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();
    let mut record = Record::find(&table, created.id().unwrap()).unwrap();

    let _ = record.transaction(|r| {
        r.update([("name", "baz")])?;
        Err::<(), _>(ChangeError::Aborted("no".into()))
    });

    assert_eq!(record.get("name"), Some(&text("foo")));
    assert!(record.saved_changes().is_empty());
    assert!(!record.saved_change_to("name"));
    assert_eq!(record.previous_change("name"), None);

    record.update([("value", "biz")]).unwrap();
    let _ = record.transaction(|r| {
        r.update([("name", "baz")])?;
        r.update([("value", "bap")])?;
        Err::<(), _>(ChangeError::Aborted("no".into()))
    });

    assert_eq!(
        record.saved_changes(),
        &[("value", AttributeChange::new("bar", "biz"))]
            .into_iter()
            .collect::<ChangeSet>()
    );
    assert!(!record.saved_change_to("name"));
}

#[test]
fn test_failed_undo_still_restores_record() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();
    let id = record.id().unwrap();
    let committed = record.saved_changes().clone();
    let other = table.clone();

    let err = record
        .transaction(|r| {
            r.update([("name", "baz")])?;
            other.delete(id)?;
            Err::<(), _>(ChangeError::Aborted("row went away".into()))
        })
        .unwrap_err();

    assert!(matches!(err, ChangeError::Aborted(_)));
    assert!(!record.in_transaction());
    assert!(!record.is_new_record());
    assert_eq!(record.get("name"), Some(&text("foo")));
    assert!(!record.has_changes_to_save());
    assert_eq!(record.aggregator().pending_saves(), 0);
    assert_eq!(record.saved_changes(), &committed);
}

#[test]
fn test_commit_error_survives_failed_rollback() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo")]).unwrap();
    let id = record.id().unwrap();
    let other = table.clone();

    record.before_commit(move |_| {
        other.delete(id)?;
        Err(ChangeError::Observer("rejected".into()))
    });

    let err = record.update([("name", "baz")]).unwrap_err();

    assert!(matches!(err, ChangeError::Observer(_)));
    assert!(!record.in_transaction());
    assert_eq!(record.get("name"), Some(&text("foo")));
}

#[test]
fn test_rollback_of_create_removes_row() {
    let table = test_models();
    let mut record = Record::new(&table);

    let _ = record.transaction(|r| {
        r.update([("name", "foo")])?;
        r.update([("value", "bar")])?;
        Err::<(), _>(ChangeError::Aborted("no".into()))
    });

    assert!(record.is_new_record());
    assert_eq!(record.id(), None);
    assert_eq!(table.row_count().unwrap(), 0);
}

#[test]
fn test_after_rollback_observers_see_last_save() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();
    let seen = Arc::new(Mutex::new(None));
    let committed = Arc::new(Mutex::new(false));

    let slot = seen.clone();
    record.after_rollback(move |view| {
        *slot.lock().unwrap() = Some(view.clone());
        Ok(())
    });
    let flag = committed.clone();
    record.after_commit(move |_| {
        *flag.lock().unwrap() = true;
        Ok(())
    });

    let _ = record.transaction(|r| {
        r.update([("name", "baz")])?;
        r.update([("value", "biz")])?;
        Err::<(), _>(ChangeError::Aborted("no".into()))
    });

    let expected: ChangeSet = [("value", AttributeChange::new("bar", "biz"))]
        .into_iter()
        .collect();
    assert_eq!(seen.lock().unwrap().as_ref(), Some(&expected));
    assert!(!*committed.lock().unwrap());
}

#[test]
fn test_failing_before_commit_observer_rolls_back() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo")]).unwrap();
    let id = record.id().unwrap();
    let after_commit_ran = Arc::new(Mutex::new(false));

    record.before_commit(|view| {
        if view.contains("value") {
            return Err(ChangeError::Observer("value is frozen".into()));
        }
        Ok(())
    });
    let flag = after_commit_ran.clone();
    record.after_commit(move |_| {
        *flag.lock().unwrap() = true;
        Ok(())
    });

    let err = record
        .transaction(|r| {
            r.update([("value", "biz")])?;
            r.update([("name", "baz")])
        })
        .unwrap_err();

    assert!(matches!(err, ChangeError::Observer(_)));
    assert!(!*after_commit_ran.lock().unwrap());
    assert!(!record.aggregator().is_aggregated());
    assert_eq!(record.get("name"), Some(&text("foo")));
    assert_eq!(table.get(id).unwrap().unwrap()[2], Value::Null);
}

#[test]
fn test_nested_transactions_join_outer() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo"), ("value", "bar")]).unwrap();
    let commits = Arc::new(Mutex::new(0));

    let counter = commits.clone();
    record.after_commit(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    record
        .transaction(|r| {
            r.update([("name", "baz")])?;
            r.transaction(|inner| inner.update([("value", "biz")]))
        })
        .unwrap();

    assert_eq!(*commits.lock().unwrap(), 1);
    assert_eq!(record.saved_changes().len(), 2);
}

#[test]
fn test_cast_error_inside_transaction_rolls_back() {
    let table = Table::new(TableSchema::new(
        "counters",
        vec![Column::new("count", DataType::Integer)],
    ));
    let mut record = Record::create(&table, [("count", 1i64)]).unwrap();

    let err = record
        .transaction(|r| {
            r.update([("count", 2i64)])?;
            r.update([("count", "lots")])
        })
        .unwrap_err();

    assert!(matches!(err, ChangeError::TypeMismatch(_)));
    assert_eq!(record.get("count"), Some(&Value::Integer(1)));
}

#[test]
fn test_json_attribute_aggregates() {
    let table = test_models();
    let mut record = Record::create(&table, [("name", "foo")]).unwrap();

    record
        .transaction(|r| {
            r.update([("settings", r#"{"theme": "dark"}"#)])?;
            r.update([("settings", serde_json::json!({"theme": "light"}))])
        })
        .unwrap();

    assert_eq!(
        record.previous_change("settings"),
        Some(&AttributeChange::new(
            Value::Null,
            serde_json::json!({"theme": "light"})
        ))
    );
}

#[test]
fn test_disabled_aggregation_reports_last_save() {
    let table = test_models();
    let mut record = Record::with_config(&table, AggregatorConfig::new().enabled(false));
    record.update([("name", "x")]).unwrap();

    record
        .transaction(|r| {
            r.update([("name", "y")])?;
            r.update([("value", "z")])
        })
        .unwrap();

    assert!(!record.aggregator().is_aggregated());
    assert_eq!(
        record.saved_changes(),
        &[("value", AttributeChange::new(Value::Null, "z"))]
            .into_iter()
            .collect::<ChangeSet>()
    );
}

#[test]
fn test_record_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Record>();
    assert_send::<ChangeAggregator>();
}

/// A host that is not a `Record`: a document whose fields are tracked by
/// hand, with one field introduced mid-transaction.
struct Document {
    tracker: MutationTracker,
}

impl Document {
    fn new() -> Self {
        let attributes: AttributeSet = [Attribute::from_database("title", DataType::Text, text("draft"))]
            .into_iter()
            .collect();
        Self {
            tracker: MutationTracker::new(attributes),
        }
    }
}

impl AttributeHost for Document {
    fn attribute_snapshot(&self) -> MutationTracker {
        self.tracker.clone()
    }
}

fn change_set(name: &str, before: Value, after: Value) -> ChangeSet {
    [(name, AttributeChange::new(before, after))].into_iter().collect()
}

#[test]
fn test_external_host_attribute_without_baseline() {
    let document = Document::new();

    for (config, expected_before) in [
        (AggregatorConfig::new(), text("imported")),
        (
            AggregatorConfig::new().missing_baseline(MissingBaseline::Null),
            Value::Null,
        ),
    ] {
        let mut aggregator = ChangeAggregator::new(config);
        aggregator.on_transaction_begin(&document);
        aggregator.on_before_save(&document);
        aggregator.on_after_save(change_set("title", text("draft"), text("final")));
        aggregator.on_after_save(change_set("tag", text("imported"), text("news")));
        aggregator.on_before_commit(&document).unwrap();

        let net = aggregator.net_changes_for_transaction();
        assert_eq!(net.get("title"), Some(&AttributeChange::new("draft", "final")));
        assert_eq!(
            net.get("tag"),
            Some(&AttributeChange::new(expected_before, text("news")))
        );
    }
}

#[test]
fn test_external_host_without_begin_uses_first_save_baseline() {
    let document = Document::new();
    let mut aggregator = ChangeAggregator::default();

    aggregator.on_before_save(&document);
    aggregator.on_after_save(change_set("title", text("draft"), text("review")));
    aggregator.on_before_save(&document);
    aggregator.on_after_save(change_set("title", text("review"), text("final")));
    aggregator.on_before_commit(&document).unwrap();

    assert_eq!(
        aggregator.previous_change("title"),
        Some(&AttributeChange::new("draft", "final"))
    );
}
