// ==========================================
// SegmentCache 并发测试
// ==========================================
// 测试目标: 同一 segment 并发请求只抓取一次, 失败同样被记忆
// ==========================================


use fibre_trace_assist::cache::SegmentCache;
use fibre_trace_assist::crawler::FetchError;
use fibre_trace_assist::engine::TrayAlertEvaluator;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{cross_section_page, MockFetcher};

#[tokio::test]
async fn test_concurrent_same_key_fetches_once() {
    let cache = Arc::new(SegmentCache::new());
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("1001", cross_section_page(24, &[8]))
            .with_delay(Duration::from_millis(20)),
    );

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { cache.fetch_or_get("1001", fetcher.as_ref()).await })
        })
        .collect();

    for result in join_all(tasks).await {
        let entry = result.unwrap().unwrap();
        assert_eq!(entry.rows.len(), 24);
    }

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.fetch_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_distinct_keys_fetch_independently() {
    let cache = SegmentCache::new();
    let fetcher = MockFetcher::new()
        .with_page("1", cross_section_page(6, &[]))
        .with_page("2", cross_section_page(6, &[1]));

    let (a, b) = tokio::join!(
        cache.fetch_or_get("1", &fetcher),
        cache.fetch_or_get("2", &fetcher)
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(fetcher.calls(), 2);

    let evaluator = TrayAlertEvaluator::default();
    assert!(!cache.evaluate_tray("1", "1-6", &evaluator));
    assert!(cache.evaluate_tray("2", "1-6", &evaluator));
    // 已记忆, 不再扫描
    assert!(cache.evaluate_tray("2", "1-6", &evaluator));
    assert_eq!(cache.scan_count(), 2);
}

#[tokio::test]
async fn test_failure_is_memoized() {
    let cache = SegmentCache::new();
    let fetcher = MockFetcher::new().with_failure("9");

    let first = cache.fetch_or_get("9", &fetcher).await.unwrap_err();
    let second = cache.fetch_or_get("9", &fetcher).await.unwrap_err();

    assert_eq!(first, second);
    assert!(matches!(first, FetchError::HttpStatus { status: 503, .. }));
    assert_eq!(fetcher.calls(), 1);
    assert!(cache.contains("9"));
    assert!(cache.entry("9").is_none());
    assert_eq!(cache.failure("9"), Some(first));
    // 失败的 segment 告警为 false
    assert!(!cache.evaluate_tray("9", "1-6", &TrayAlertEvaluator::default()));
}

#[tokio::test]
async fn test_clear_allows_refetch() {
    let cache = SegmentCache::new();
    let fetcher = MockFetcher::new().with_page("1", cross_section_page(6, &[]));

    cache.fetch_or_get("1", &fetcher).await.unwrap();
    cache.clear();
    assert!(cache.is_empty());

    cache.fetch_or_get("1", &fetcher).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}
