use std::sync::Arc;

use downlink_core::datasource::memory::MemoryDataSource;
use downlink_core::datasource::mock::CountingStore;
use downlink_core::lock::MemoryKeyLock;
use downlink_core::preamble::*;
use serde::Serialize;

#[tokio::test]
async fn test_cache_fills_at_most_once() {
    let source = CountingStore::with_items(vec![
        ("a".to_string(), 0_i64),
        ("b".to_string(), 1),
    ]);
    let sink: CountingStore<String, i64> = CountingStore::new();
    let dataset = source.clone().cached(sink.clone());

    // miss: try the sink, load from the source, fill the sink and read it
    // back immediately after
    assert_eq!(dataset.get("a".to_string()).await.unwrap(), 0);
    assert_eq!(source.get_count(), 1);
    assert_eq!(sink.set_count(), 1);
    assert_eq!(sink.get_count(), 2);

    // hit: the source is not consulted again
    assert_eq!(dataset.get("a".to_string()).await.unwrap(), 0);
    assert_eq!(source.get_count(), 1);
    assert_eq!(sink.set_count(), 1);
    assert_eq!(sink.get_count(), 3);

    assert_eq!(dataset.get("b".to_string()).await.unwrap(), 1);
    assert_eq!(source.get_count(), 2);
    assert_eq!(sink.set_count(), 2);
    assert_eq!(sink.get_count(), 5);
}

#[tokio::test]
async fn test_cached_source_stays_queryable() {
    let source = CountingStore::with_items(vec![
        ("a".to_string(), 0_i64),
        ("b".to_string(), 1),
    ]);
    let dataset = source.clone().cached(CountingStore::new());

    source.set("ahoj".to_string(), 2).await.unwrap();
    let ids = dataset
        .query(&Criteria::new().with("prefix", "a"))
        .await
        .expect("query must be reachable through the cache wrapper");
    assert_eq!(ids.len(), 2);

    let values = dataset.get_many(ids).await.unwrap();
    assert_eq!(values, vec![0, 2]);
}

#[tokio::test]
async fn test_skip_predicate_bypasses_cache_population() {
    let source = CountingStore::with_items(vec![
        ("a".to_string(), 0_i64),
        ("b".to_string(), 1),
    ]);
    let sink: CountingStore<String, i64> = CountingStore::new();
    let dataset = source
        .cached(sink.clone())
        .with_skip_if(|key: &String, _value: &i64| key.as_str() == "a");

    // "a" is returned directly and never cached
    assert_eq!(dataset.get("a".to_string()).await.unwrap(), 0);
    assert_eq!(sink.len(), 0);
    assert_eq!(sink.set_count(), 0);

    // "b" is cached
    assert_eq!(dataset.get("b".to_string()).await.unwrap(), 1);
    assert_eq!(sink.len(), 1);

    // a skipped key loads from the source every time
    assert_eq!(dataset.get("a".to_string()).await.unwrap(), 0);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_cache_over_transformed_source() {
    let source = CountingStore::with_items(vec![(0_i64, 0_i64), (1, 1), (2, 2)]);
    let sink: CountingStore<i64, i64> = CountingStore::new();
    let dataset = source
        .clone()
        .then(transform_fn(|v: i64| v + 1))
        .cached(sink.clone());

    // cache-miss, the transform shifts the value by 1
    assert_eq!(dataset.get(0).await.unwrap(), 1);
    assert_eq!(source.get_count(), 1);
    assert_eq!(sink.set_count(), 1);
    assert_eq!(sink.get_count(), 2);

    // cache-hit
    assert_eq!(dataset.get(0).await.unwrap(), 1);
    assert_eq!(source.get_count(), 1);
    assert_eq!(sink.set_count(), 1);
    assert_eq!(sink.get_count(), 3);

    // cache-miss for another key
    assert_eq!(dataset.get(1).await.unwrap(), 2);
    assert_eq!(source.get_count(), 2);
    assert_eq!(sink.set_count(), 2);
    assert_eq!(sink.get_count(), 5);
}

#[tokio::test]
async fn test_cache_fill_under_lock() {
    let source = CountingStore::with_items(vec![("a".to_string(), 1_i64)]);
    let dataset = source
        .cached(CountingStore::new())
        .with_lock(Arc::new(MemoryKeyLock::new()));

    // the fill lock is released after the miss path, so a repeated get
    // must neither dead-lock nor reload
    assert_eq!(dataset.get("a".to_string()).await.unwrap(), 1);
    assert_eq!(dataset.get("a".to_string()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_query_without_resolution_cache_requeries() {
    let source = CountingStore::with_items(vec![
        ("a1".to_string(), 10_i64),
        ("a2".to_string(), 20),
        ("b1".to_string(), 30),
    ]);
    let queried = source.clone().by_query(KeyBinding::field("prefix"));

    let values = queried.get("a".to_string()).await.unwrap();
    assert_eq!(values, vec![10, 20]);
    assert_eq!(source.query_count(), 1);

    let values = queried.get("a".to_string()).await.unwrap();
    assert_eq!(values, vec![10, 20]);
    assert_eq!(source.query_count(), 2);
}

#[tokio::test]
async fn test_query_resolution_cache_saturates_query_count() {
    let source = CountingStore::with_items(vec![
        ("a1".to_string(), 10_i64),
        ("a2".to_string(), 20),
        ("b1".to_string(), 30),
    ]);
    let resolution_cache: MemoryDataSource<String, Vec<String>> = MemoryDataSource::new();
    let queried = source
        .clone()
        .by_query(KeyBinding::field("prefix"))
        .with_resolution_cache(Box::new(resolution_cache));

    let first = queried.get("a".to_string()).await.unwrap();
    assert_eq!(source.query_count(), 1);

    // the repeated key resolves from the cache, values stay identical
    let second = queried.get("a".to_string()).await.unwrap();
    assert_eq!(source.query_count(), 1);
    assert_eq!(first, second);

    // a different key still triggers a query
    let other = queried.get("b".to_string()).await.unwrap();
    assert_eq!(source.query_count(), 2);
    assert_eq!(other, vec![30]);
}

#[tokio::test]
async fn test_query_binding_with_callable() {
    let source = CountingStore::with_items(vec![
        ("a1".to_string(), 10_i64),
        ("b1".to_string(), 30),
    ]);
    let queried = source.by_query(KeyBinding::with(|key: &String| {
        Ok(Criteria::new().with("prefix", key.clone()))
    }));

    assert_eq!(queried.get("b".to_string()).await.unwrap(), vec![30]);
}

#[tokio::test]
async fn test_query_binding_as_criteria() {
    #[derive(Serialize, Debug, Clone)]
    struct PrefixKey {
        prefix: String,
    }

    let source = CountingStore::with_items(vec![
        ("a1".to_string(), 10_i64),
        ("a2".to_string(), 20),
        ("b1".to_string(), 30),
    ]);
    let queried = source.by_query(KeyBinding::AsCriteria);

    let values = queried
        .get(PrefixKey {
            prefix: "a".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(values, vec![10, 20]);
}

#[tokio::test]
async fn test_query_binding_rejects_non_mapping_key() {
    let source = CountingStore::with_items(vec![("a1".to_string(), 10_i64)]);
    let queried = source.by_query(KeyBinding::AsCriteria);

    match queried.get("a".to_string()).await {
        Err(PipelineError::InvalidKey(_)) => {}
        other => panic!("expected InvalidKey, got {:?}", other),
    }
}

#[tokio::test]
async fn test_queried_multi_key_decomposes() {
    let source = CountingStore::with_items(vec![
        ("a1".to_string(), 10_i64),
        ("b1".to_string(), 30),
    ]);
    let queried = source.by_query(KeyBinding::field("prefix"));

    let results = queried
        .get_many(vec!["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(results, vec![vec![10], vec![30]]);
}
