use mbg_kalkulator::{
    MemoryStorage, PortionBreakdown, PortionKind, RecordForm, RecordStore, StoreConfig,
    StoreError, ValidationError,
};

fn store() -> RecordStore<MemoryStorage> {
    RecordStore::open(MemoryStorage::new(), StoreConfig::default())
}

fn seeded(names: &[&str]) -> RecordStore<MemoryStorage> {
    let mut store = store();
    for (i, name) in names.iter().enumerate() {
        let count = u32::try_from(i).unwrap();
        store
            .create(&RecordForm::new(*name, count, count * 2))
            .unwrap()
            .durable()
            .unwrap();
    }
    store
}

fn names(store: &RecordStore<MemoryStorage>) -> Vec<String> {
    store.list().into_iter().map(|r| r.name).collect()
}

#[test]
fn create_appends_with_fresh_id() {
    let mut store = seeded(&["SDN 1", "SDN 2"]);
    let created = store
        .create(&RecordForm::new(" SMP 3 ", "10", "4"))
        .unwrap()
        .durable()
        .unwrap();

    let list = store.list();
    let last = list.last().unwrap();
    assert_eq!(last, &created);
    assert_eq!(last.name, "SMP 3");
    assert_eq!((last.large, last.small), (10, 4));
    assert!(list[..2].iter().all(|r| r.id != created.id));
}

#[test]
fn create_stores_long_names_with_tabs_verbatim() {
    let mut store = store();
    let name = format!("SD\tNegeri 1 {}", "S".repeat(150));
    store
        .create(&RecordForm::new(format!("  {name}  "), 1, 1))
        .unwrap()
        .durable()
        .unwrap();
    assert_eq!(store.list()[0].name, name);

    let renamed = format!("{name}\tBogor");
    store.update(0, &RecordForm::new(renamed.as_str(), 1, 1)).unwrap().into_inner();
    assert_eq!(store.get(0).unwrap().name, renamed);
}

#[test]
fn create_rejects_blank_name_without_mutation() {
    let mut store = seeded(&["SDN 1"]);
    let before = store.list();
    let err = store.create(&RecordForm::new("   ", 1, 1)).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::NameRequired)
    ));
    assert_eq!(store.list(), before);
}

#[test]
fn create_rejects_negative_count() {
    let mut store = store();
    let err = store.create(&RecordForm::new("SD", "-5", "1")).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::InvalidCount {
            kind: PortionKind::Large,
            ..
        })
    ));
    assert!(store.is_empty());
}

#[test]
fn create_coerces_non_numeric_counts_to_zero() {
    let mut store = store();
    let record = store
        .create(&RecordForm::new("SD", "abc", ""))
        .unwrap()
        .into_inner();
    assert_eq!((record.large, record.small), (0, 0));
}

#[test]
fn update_keeps_id_and_position() {
    let mut store = seeded(&["A", "B", "C"]);
    let original = store.get(1).unwrap().clone();
    let updated = store
        .update(1, &RecordForm::new("B2", 9, 6))
        .unwrap()
        .durable()
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(names(&store), ["A", "B2", "C"]);
    assert_eq!(store.get(1).unwrap().large, 9);
    assert!(updated.created_at >= original.created_at);
}

#[test]
fn update_out_of_range_is_not_found() {
    let mut store = seeded(&["A", "B", "C"]);
    let before = store.list();
    let err = store.update(5, &RecordForm::new("X", 1, 1)).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { index: 5, len: 3 }));
    assert_eq!(store.list(), before);
}

#[test]
fn update_with_invalid_fields_leaves_record() {
    let mut store = seeded(&["A"]);
    let before = store.list();
    assert!(store.update(0, &RecordForm::new("", 1, 1)).is_err());
    assert_eq!(store.list(), before);
}

#[test]
fn delete_shifts_later_records() {
    let mut store = seeded(&["A", "B", "C", "D"]);
    let before = store.list();
    let removed = store.delete(1).unwrap().durable().unwrap();

    assert_eq!(removed, before[1]);
    let after = store.list();
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1..], before[2..]);
}

#[test]
fn delete_out_of_range_is_not_found() {
    let mut store = seeded(&["A"]);
    assert!(matches!(
        store.delete(1),
        Err(StoreError::NotFound { index: 1, len: 1 })
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn clear_is_idempotent() {
    let mut store = seeded(&["A", "B"]);
    assert_eq!(store.clear().durable().unwrap(), 2);
    assert!(store.is_empty());
    assert_eq!(store.clear().durable().unwrap(), 0);
    assert!(store.is_empty());
}

#[test]
fn list_is_a_detached_snapshot() {
    let mut store = seeded(&["A"]);
    let mut snapshot = store.list();
    snapshot[0].name = "changed".to_string();
    snapshot.clear();
    assert_eq!(names(&store), ["A"]);

    store.create(&RecordForm::new("B", 1, 1)).unwrap().into_inner();
    assert!(snapshot.is_empty());
}

#[test]
fn totals_follow_bundle_arithmetic() {
    let mut store = store();
    store.create(&RecordForm::new("SD 1", 10, 3)).unwrap().into_inner();
    store.create(&RecordForm::new("SD 2", 7, 8)).unwrap().into_inner();

    let totals = store.totals();
    assert_eq!(totals.records, 2);
    assert_eq!(
        totals.large,
        PortionBreakdown { count: 17, bundles: 3, remainder: 2 }
    );
    assert_eq!(
        totals.small,
        PortionBreakdown { count: 11, bundles: 2, remainder: 1 }
    );

    let first = store.breakdown(0).unwrap();
    assert_eq!((first.large.bundles, first.large.remainder), (2, 0));
    assert_eq!((first.small.bundles, first.small.remainder), (0, 3));
    assert!(store.breakdown(2).is_none());
}

#[test]
fn totals_of_empty_store_are_zero() {
    let totals = store().totals();
    assert_eq!(totals.records, 0);
    assert_eq!(totals.large, PortionBreakdown::default());
    assert_eq!(totals.small, PortionBreakdown::default());
}

#[test]
fn bundle_size_comes_from_config() {
    let config = StoreConfig {
        bundle_size: 6,
        ..StoreConfig::default()
    };
    let mut store = RecordStore::open(MemoryStorage::new(), config);
    store.create(&RecordForm::new("SD", 13, 0)).unwrap().into_inner();
    let totals = store.totals();
    assert_eq!((totals.large.bundles, totals.large.remainder), (2, 1));
}
