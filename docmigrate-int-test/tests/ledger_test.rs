use chrono::{TimeZone, Utc};
use docmigrate::errors::ErrorKind;
use docmigrate::ledger::memory::InMemoryDatabase;
use docmigrate::ledger::{LedgerSource, VersionLedgerProvider};
use docmigrate::version::Version;
use docmigrate::MigrationContext;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_empty_ledger() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();

    assert!(ledger.current(&ctx).unwrap().is_none());
    assert_eq!(ledger.current_id(&ctx).unwrap(), 0);
    assert!(ledger.history(&ctx).unwrap().is_empty());
    assert!(ledger.find(&ctx, 1).unwrap().is_none());
}

#[test]
fn test_current_is_latest_written_not_greatest() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();

    ledger.set(&ctx, &Version::new(5, "five")).unwrap();
    ledger.set(&ctx, &Version::new(3, "three")).unwrap();

    assert_eq!(ledger.current_id(&ctx).unwrap(), 3);
}

#[test]
fn test_get_returns_latest_record_for_id() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();
    let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    ledger.set(&ctx, &Version::with_timestamp(3, "applied", first)).unwrap();
    ledger.set(&ctx, &Version::new(1, "")).unwrap();
    ledger.set(&ctx, &Version::with_timestamp(3, "reapplied", second)).unwrap();

    let version = ledger.get(&ctx, 3).unwrap();
    assert_eq!(version.description(), "reapplied");
    assert_eq!(version.timestamp(), second);
    assert_eq!(ledger.history(&ctx).unwrap().len(), 3);
}

#[test]
fn test_get_missing_is_not_found() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();

    let err = ledger.get(&ctx, 42).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::NotFound);
    assert!(err.message().contains("42"));
}

#[test]
fn test_delete_removes_every_record_for_id() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();

    ledger.set(&ctx, &Version::new(1, "")).unwrap();
    ledger.set(&ctx, &Version::new(2, "")).unwrap();
    ledger.set(&ctx, &Version::new(1, "")).unwrap();
    ledger.delete(&ctx, 1).unwrap();

    let ids: Vec<u64> = ledger.history(&ctx).unwrap().iter().map(|v| v.id()).collect();
    assert_eq!(ids, vec![2]);
    assert_eq!(ledger.current_id(&ctx).unwrap(), 2);

    // deleting an absent id is fine
    ledger.delete(&ctx, 9).unwrap();
}

#[test]
fn test_handles_share_records() {
    let db = InMemoryDatabase::new();
    let ctx = MigrationContext::new();
    let writer = db.version_ledger("migrations").unwrap();
    let reader = db.clone().version_ledger("migrations").unwrap();

    writer.set(&ctx, &Version::new(7, "shared")).unwrap();
    assert_eq!(reader.current_id(&ctx).unwrap(), 7);
    assert_eq!(reader.collection_name(), "migrations");
}

#[test]
fn test_separate_collections_are_isolated() {
    let db = InMemoryDatabase::new();
    let ctx = MigrationContext::new();
    let a = db.version_ledger("a").unwrap();
    let b = db.version_ledger("b").unwrap();

    a.set(&ctx, &Version::new(1, "")).unwrap();
    assert_eq!(b.current_id(&ctx).unwrap(), 0);

    let names: Vec<String> = db.collection_names().into_iter().collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_closed_database() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();
    db.close();

    assert!(db.is_closed());
    let err = ledger.set(&ctx, &Version::new(1, "")).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::StoreAccessError);
    assert!(db.version_ledger("other").is_err());
}

#[test]
fn test_cancelled_context_is_checked_first() {
    let db = InMemoryDatabase::new();
    let ledger = db.version_ledger("migrations").unwrap();
    let ctx = MigrationContext::new();
    ctx.cancel();

    assert_eq!(ledger.current(&ctx).unwrap_err().kind(), &ErrorKind::Cancelled);
    assert_eq!(
        ledger.set(&ctx, &Version::new(1, "")).unwrap_err().kind(),
        &ErrorKind::Cancelled
    );

    let fresh = MigrationContext::new();
    assert!(ledger.history(&fresh).unwrap().is_empty());
}
