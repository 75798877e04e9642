use recordbox_core::{EntityId, FieldValue, Timestamp, domains};
use recordbox_engine::EngineError;
use recordbox_harness::{TestApp, fields, task};

fn minutes_after_start(minutes: i64) -> Result<Timestamp, recordbox_core::CoreError> {
    let start = TestApp::start()?;
    Ok(Timestamp::from_datetime(*start.as_datetime() + chrono::Duration::minutes(minutes)))
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn create_assigns_fresh_id_and_equal_timestamps() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;

    let first = app.store.create(task("Buy milk"))?.into_value();
    let second = app.store.create(task("Buy bread"))?.into_value();

    assert_ne!(first.id, second.id);
    assert_eq!(first.created_at, first.updated_at);
    assert_eq!(first.created_at, TestApp::start()?);
    assert_eq!(first.text("title"), Some("Buy milk"));
    assert_eq!(app.store.get(&first.id), Some(&first));
    Ok(())
}

#[test]
fn create_trims_primary_field() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app.store.create(task("  Buy milk  "))?.into_value();
    assert_eq!(created.text("title"), Some("Buy milk"));
    Ok(())
}

#[test]
fn create_without_primary_field_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;

    let err = app.store.create(fields(&[("description", "no title".into())])).unwrap_err();
    let EngineError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(validation.has_issue("title"));

    let err = app.store.create(task("   ")).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(app.store.is_empty());
    assert_eq!(app.store.adapter().write_count(), 0);
    Ok(())
}

#[test]
fn create_enforces_length_ceiling() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let long = "x".repeat(121);

    let err = app.store.create(task(&long)).unwrap_err();
    let EngineError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(validation.has_issue("title"));

    app.store.create(task(&"x".repeat(120)))?;
    assert_eq!(app.store.len(), 1);
    Ok(())
}

#[test]
fn create_reports_every_invalid_field() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::bookings())?;
    let err = app
        .store
        .create(fields(&[
            ("title", "Haircut".into()),
            ("date", "01/02/2025".into()),
            ("time", "25:99".into()),
            ("status", "maybe".into()),
        ]))
        .unwrap_err();
    let EngineError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let mut named: Vec<&str> = validation.fields().collect();
    named.sort_unstable();
    assert_eq!(named, vec!["date", "status", "time"]);
    Ok(())
}

#[test]
fn create_ignores_store_owned_keys() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app
        .store
        .create(fields(&[
            ("title", "Buy milk".into()),
            ("id", "forced".into()),
            ("createdAt", "1999-01-01T00:00:00Z".into()),
        ]))?
        .into_value();

    assert_ne!(created.id.as_str(), "forced");
    assert_eq!(created.created_at, TestApp::start()?);
    assert!(created.get("id").is_none());
    assert!(created.get("createdAt").is_none());
    Ok(())
}

#[test]
fn list_keeps_insertion_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    for title in ["one", "two", "three"] {
        app.store.create(task(title))?;
    }
    let titles: Vec<_> = app.store.list().iter().filter_map(|e| e.text("title")).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
    Ok(())
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn update_unknown_id_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    app.store.create(task("Buy milk"))?;
    let before = app.store.list().to_vec();
    let writes = app.store.adapter().write_count();

    let missing = EntityId::parse("missing-id")?;
    let err = app.store.update(&missing, task("x")).unwrap_err();

    assert!(matches!(err, EngineError::NotFound(ref id) if *id == missing));
    assert_eq!(app.store.list(), before.as_slice());
    assert_eq!(app.store.adapter().write_count(), writes);
    Ok(())
}

#[test]
fn update_merges_patch_and_advances_updated_at() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app
        .store
        .create(fields(&[("title", "Buy milk".into()), ("priority", "low".into())]))?
        .into_value();

    app.advance_minutes(5);
    let updated = app
        .store
        .update(&created.id, fields(&[("priority", "high".into())]))?
        .into_value();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.text("title"), Some("Buy milk"));
    assert_eq!(updated.text("priority"), Some("high"));
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.updated_at, minutes_after_start(5)?);
    Ok(())
}

#[test]
fn update_with_null_removes_field() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app
        .store
        .create(fields(&[("title", "Buy milk".into()), ("description", "2 litres".into())]))?
        .into_value();

    let updated = app
        .store
        .update(&created.id, fields(&[("description", FieldValue::Null)]))?
        .into_value();
    assert!(updated.get("description").is_none());
    Ok(())
}

#[test]
fn update_failing_validation_leaves_store_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app.store.create(task("Buy milk"))?.into_value();

    let err = app.store.update(&created.id, task("")).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(app.store.get(&created.id), Some(&created));

    let err = app
        .store
        .update(&created.id, fields(&[("title", FieldValue::Null)]))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(app.store.get(&created.id), Some(&created));
    Ok(())
}

#[test]
fn updated_at_never_decreases_when_clock_goes_back() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app.store.create(task("Buy milk"))?.into_value();

    app.advance_minutes(10);
    let first = app.store.update(&created.id, task("Buy oat milk"))?.into_value();
    app.advance_minutes(-60);
    let second = app.store.update(&created.id, task("Buy soy milk"))?.into_value();

    assert!(first.updated_at >= created.updated_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.created_at, created.created_at);
    Ok(())
}

#[test]
fn update_ignores_attempts_to_change_id() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let created = app.store.create(task("Buy milk"))?.into_value();

    let updated = app
        .store
        .update(&created.id, fields(&[("id", "other".into()), ("title", "Buy bread".into())]))?
        .into_value();
    assert_eq!(updated.id, created.id);
    assert!(app.store.get(&EntityId::parse("other")?).is_none());
    Ok(())
}

// ============================================================================
// Delete / clear
// ============================================================================

#[test]
fn delete_removes_then_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    let keep = app.store.create(task("keep"))?.into_value();
    let drop = app.store.create(task("drop"))?.into_value();

    assert!(app.store.delete(&drop.id).into_value());
    assert!(!app.store.delete(&drop.id).into_value());
    assert_eq!(app.store.list(), &[keep]);
    Ok(())
}

#[test]
fn deleting_absent_id_twice_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    app.store.create(task("Buy milk"))?;
    let before = app.store.list().to_vec();
    let writes = app.store.adapter().write_count();

    let ghost = EntityId::parse("ghost")?;
    let first = app.store.delete(&ghost);
    let second = app.store.delete(&ghost);

    assert!(!first.value);
    assert_eq!(first, second);
    assert_eq!(app.store.list(), before.as_slice());
    assert_eq!(app.store.adapter().write_count(), writes);
    Ok(())
}

#[test]
fn clear_removes_everything() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = TestApp::new(domains::tasks())?;
    for title in ["a", "b", "c"] {
        app.store.create(task(title))?;
    }
    let cleared = app.store.clear();
    assert_eq!(cleared.value, 3);
    assert!(cleared.is_durable());
    assert!(app.store.is_empty());
    assert_eq!(app.persisted(), Some(serde_json::json!([])));
    Ok(())
}
