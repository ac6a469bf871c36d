//! End-to-end persistence scenarios for the storage cache

use serde_json::{json, Value};
use serial_test::serial;
use stashkv_cache::{
    CacheConfig, ExternalStorageOptions, InstanceCounter, ManualClock, MemoryStorage,
    RestoreOptions, SessionStorage, SetOptions, StorageBackend, StorageCache,
};
use std::sync::Arc;
use std::time::Duration;

fn cache_with_id(id: &str) -> StorageCache {
    StorageCache::new(CacheConfig::builder().with_id(id).build())
}

fn stored_snapshot(storage: &MemoryStorage, id: &str) -> Option<Value> {
    storage
        .get_item(id)
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

#[test]
fn simple_set_get() {
    let cache = cache_with_id("test");

    cache.set("key1", "value1", SetOptions::default()).unwrap();

    assert_eq!(cache.get("key1").unwrap(), Some(json!("value1")));
    assert_eq!(cache.id(), "test");
}

#[test]
fn set_get_with_expired_ttl() {
    let clock = Arc::new(ManualClock::new());
    let cache = StorageCache::new(
        CacheConfig::builder()
            .with_id("test")
            .with_clock(clock.clone())
            .build(),
    );

    cache
        .set("key1", "value1", SetOptions::ttl(Duration::from_millis(1000)))
        .unwrap();
    assert_eq!(cache.get("key1").unwrap(), Some(json!("value1")));

    clock.advance(Duration::from_millis(2000));
    assert_eq!(cache.get("key1").unwrap(), None);
}

#[test]
fn set_get_with_expired_default_ttl() {
    let clock = Arc::new(ManualClock::new());
    let cache = StorageCache::new(
        CacheConfig::builder()
            .with_id("test")
            .with_default_ttl(Duration::from_millis(1000))
            .with_clock(clock.clone())
            .build(),
    );

    cache.set("key1", "value1", SetOptions::default()).unwrap();
    assert_eq!(cache.get("key1").unwrap(), Some(json!("value1")));

    clock.advance(Duration::from_millis(2000));
    assert_eq!(cache.get("key1").unwrap(), None);
}

#[test]
fn placeholder_identity_uses_injected_counter() {
    let counter = Arc::new(InstanceCounter::new());

    let first = StorageCache::new(
        CacheConfig::builder()
            .with_instance_counter(counter.clone())
            .build(),
    );
    let named = StorageCache::new(
        CacheConfig::builder()
            .with_id("test")
            .with_instance_counter(counter.clone())
            .build(),
    );
    let third = StorageCache::new(
        CacheConfig::builder()
            .with_instance_counter(counter.clone())
            .build(),
    );

    assert_eq!(first.id(), "tmp-storage-0");
    // The counter advances for every construction, named or not
    assert_eq!(named.id(), "test");
    assert_eq!(third.id(), "tmp-storage-2");
}

#[test]
fn operation_interval_of_one_persists_every_operation() {
    let cache = cache_with_id("test");
    let storage = Arc::new(MemoryStorage::new());

    cache.add_external_storage(
        ExternalStorageOptions::custom(storage.clone()).with_interval_in_operations(1),
    );

    cache.set("key1", "value1", SetOptions::default()).unwrap();

    assert_eq!(
        stored_snapshot(&storage, "test"),
        Some(json!({ "key1": "value1" }))
    );
    assert_eq!(cache.get("key1").unwrap(), Some(json!("value1")));
}

#[test]
fn operation_interval_greater_than_one_fires_on_nth_operation() {
    let cache = cache_with_id("test");
    let storage = Arc::new(MemoryStorage::new());

    cache.add_external_storage(
        ExternalStorageOptions::custom(storage.clone()).with_interval_in_operations(2),
    );

    cache.set("key1", "value1", SetOptions::default()).unwrap();
    let after_first_op = storage.get_item("test").unwrap();

    // A read counts as an operation for sweep purposes
    let read = cache.get("key1").unwrap();
    let after_second_op = stored_snapshot(&storage, "test");

    assert_eq!(after_first_op, None);
    assert_eq!(read, Some(json!("value1")));
    assert_eq!(after_second_op, Some(json!({ "key1": "value1" })));
}

#[test]
fn operation_interval_keeps_firing_every_nth_operation() {
    let cache = cache_with_id("test");
    let storage = Arc::new(MemoryStorage::new());

    cache.add_external_storage(
        ExternalStorageOptions::custom(storage.clone()).with_interval_in_operations(3),
    );

    for i in 0..2 {
        cache.set(format!("key{i}"), i, SetOptions::default()).unwrap();
        assert_eq!(storage.get_item("test").unwrap(), None, "operation {}", i + 1);
    }

    // 3rd operation: first write
    cache.set("key2", 2, SetOptions::default()).unwrap();
    assert_eq!(
        stored_snapshot(&storage, "test"),
        Some(json!({ "key0": 0, "key1": 1, "key2": 2 }))
    );

    // Operations 4 and 5 stay quiet, the 6th writes again
    cache.remove("key0").unwrap();
    cache.remove("key1").unwrap();
    let before_sixth = stored_snapshot(&storage, "test");
    cache.remove("key2").unwrap();

    assert_eq!(
        before_sixth,
        Some(json!({ "key0": 0, "key1": 1, "key2": 2 }))
    );
    assert_eq!(stored_snapshot(&storage, "test"), Some(json!({})));
}

#[test]
fn bindings_fire_independently() {
    let cache = cache_with_id("test");
    let every_two = Arc::new(MemoryStorage::new());
    let every_three = Arc::new(MemoryStorage::new());

    cache.add_external_storage(
        ExternalStorageOptions::custom(every_two.clone()).with_interval_in_operations(2),
    );
    cache.add_external_storage(
        ExternalStorageOptions::custom(every_three.clone()).with_interval_in_operations(3),
    );

    cache.set("key1", "value1", SetOptions::default()).unwrap();
    assert_eq!(every_two.get_item("test").unwrap(), None);
    assert_eq!(every_three.get_item("test").unwrap(), None);

    cache.set("key2", "value2", SetOptions::default()).unwrap();
    assert_eq!(
        stored_snapshot(&every_two, "test"),
        Some(json!({ "key1": "value1", "key2": "value2" }))
    );
    assert_eq!(every_three.get_item("test").unwrap(), None);

    cache.set("key3", "value3", SetOptions::default()).unwrap();
    assert_eq!(
        stored_snapshot(&every_three, "test"),
        Some(json!({ "key1": "value1", "key2": "value2", "key3": "value3" }))
    );
    // The two-operation binding is midway through its next window
    assert_eq!(
        stored_snapshot(&every_two, "test"),
        Some(json!({ "key1": "value1", "key2": "value2" }))
    );
}

#[test]
fn restore_data_round_trips_between_instances() {
    let storage = Arc::new(MemoryStorage::new());

    let writer = cache_with_id("test");
    writer.add_external_storage(
        ExternalStorageOptions::custom(storage.clone()).with_interval_in_operations(1),
    );
    writer.set("key1", "value1", SetOptions::default()).unwrap();
    let persisted = writer.extract();

    let reader = cache_with_id("test");
    reader.add_external_storage(
        ExternalStorageOptions::custom(storage.clone()).with_interval_in_operations(2),
    );

    assert!(reader.extract().is_empty());
    reader.restore_data(RestoreOptions::default()).unwrap();

    assert_eq!(reader.extract(), persisted);
    assert_eq!(reader.get("key1").unwrap(), Some(json!("value1")));
}

#[test]
fn restore_data_selects_binding_by_label() {
    let plain = Arc::new(MemoryStorage::new());
    let labeled = Arc::new(MemoryStorage::new());
    labeled
        .set_item("test", r#"{"key1":"value1"}"#)
        .unwrap();

    let cache = cache_with_id("test");
    cache.add_external_storage(ExternalStorageOptions::custom(plain));
    cache.add_external_storage(
        ExternalStorageOptions::custom(labeled).with_id("mirror"),
    );

    cache
        .restore_data(RestoreOptions::binding("mirror"))
        .unwrap();

    assert_eq!(cache.extract(), [("key1".to_string(), json!("value1"))].into());
}

#[test]
fn restore_data_replaces_rather_than_merges() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item("test", r#"{"restored":"value"}"#).unwrap();

    let cache = cache_with_id("test");
    cache.add_external_storage(ExternalStorageOptions::custom(storage));
    cache.set("stale", "entry", SetOptions::default()).unwrap();

    cache.restore_data(RestoreOptions::default()).unwrap();

    assert_eq!(cache.extract(), [("restored".to_string(), json!("value"))].into());
}

#[test]
#[serial]
fn session_storage_binding_round_trips_within_the_process() {
    SessionStorage::clear();

    let writer = cache_with_id("test");
    writer.add_external_storage(
        ExternalStorageOptions::session().with_interval_in_operations(1),
    );
    writer.set("key1", "value1", SetOptions::default()).unwrap();

    let reader = cache_with_id("test");
    reader.add_external_storage(ExternalStorageOptions::session());
    reader.restore_data(RestoreOptions::default()).unwrap();

    assert_eq!(reader.get("key1").unwrap(), Some(json!("value1")));

    SessionStorage::clear();
}

#[test]
#[serial]
fn local_storage_binding_persists_to_the_cache_directory() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let original = std::env::var("XDG_CACHE_HOME").ok();
    std::env::set_var("XDG_CACHE_HOME", temp_dir.path());

    let cache = cache_with_id("test");
    cache.add_external_storage(
        ExternalStorageOptions::local().with_interval_in_operations(1),
    );
    cache.set("key1", "value1", SetOptions::default()).unwrap();

    let persisted = temp_dir.path().join("stashkv").join("test.json");
    let raw = std::fs::read_to_string(&persisted).unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(&raw).unwrap(),
        json!({ "key1": "value1" })
    );

    match original {
        Some(value) => std::env::set_var("XDG_CACHE_HOME", value),
        None => std::env::remove_var("XDG_CACHE_HOME"),
    }
}

#[tokio::test(start_paused = true)]
async fn interval_timer_persists_snapshots() {
    let cache = cache_with_id("test");
    let storage = Arc::new(MemoryStorage::new());

    cache.add_external_storage(
        ExternalStorageOptions::custom(storage.clone())
            .with_interval(Duration::from_millis(1000)),
    );
    assert_eq!(cache.armed_timer_count(), 1);

    cache.set("key1", "value1", SetOptions::default()).unwrap();

    // Nothing is written before the first period elapses
    assert_eq!(storage.get_item("test").unwrap(), None);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    tokio::task::yield_now().await;

    assert_eq!(
        stored_snapshot(&storage, "test"),
        Some(json!({ "key1": "value1" }))
    );
}

#[tokio::test(start_paused = true)]
async fn interval_timer_rewrites_on_every_period() {
    let cache = cache_with_id("test");
    let storage = Arc::new(MemoryStorage::new());

    cache.add_external_storage(
        ExternalStorageOptions::custom(storage.clone())
            .with_interval(Duration::from_millis(1000)),
    );

    cache.set("key1", "value1", SetOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    tokio::task::yield_now().await;
    assert_eq!(
        stored_snapshot(&storage, "test"),
        Some(json!({ "key1": "value1" }))
    );

    cache.set("key2", "value2", SetOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    tokio::task::yield_now().await;
    assert_eq!(
        stored_snapshot(&storage, "test"),
        Some(json!({ "key1": "value1", "key2": "value2" }))
    );
}

#[tokio::test(start_paused = true)]
async fn each_registration_arms_exactly_one_timer() {
    let cache = cache_with_id("test");

    cache.add_external_storage(
        ExternalStorageOptions::custom(Arc::new(MemoryStorage::new()))
            .with_interval(Duration::from_millis(1000)),
    );
    cache.add_external_storage(ExternalStorageOptions::custom(Arc::new(
        MemoryStorage::new(),
    )));

    assert_eq!(cache.external_storage_count(), 2);
    assert_eq!(cache.armed_timer_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_cache_stops_its_timer() {
    let storage = Arc::new(MemoryStorage::new());

    {
        let cache = cache_with_id("test");
        cache.add_external_storage(
            ExternalStorageOptions::custom(storage.clone())
                .with_interval(Duration::from_millis(1000)),
        );
        cache.set("key1", "value1", SetOptions::default()).unwrap();
    }

    // The timer was aborted with the cache; periods elapsing afterwards
    // must not produce writes
    tokio::time::sleep(Duration::from_millis(3000)).await;
    tokio::task::yield_now().await;

    assert_eq!(storage.get_item("test").unwrap(), None);
}
