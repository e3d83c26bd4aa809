// ==========================================
// 光纤路由分析 - 截面缓存
// ==========================================
// 职责: 按 segment id 去重抓取截面表, 记忆纤盘告警
// 不变量:
// - 同一次运行内, 同一 segment 最多抓取一次（失败结果同样记忆）
// - 同一 (segment, 纤盘) 只扫描一次
// 并发: 每个 segment 一个 tokio OnceCell, 并发请求同一 key 时只有一个真正抓取
// 生命周期: 运行开始与关闭时清空
// ==========================================

use crate::cache::cross_section::CrossSectionTable;
use crate::crawler::{DetailFetcher, FetchError, FetchResult};
use crate::engine::alert_evaluator::{HeaderIndex, TrayAlertEvaluator};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

// ==========================================
// SegmentCacheEntry - 单个 segment 的截面表
// ==========================================
#[derive(Debug)]
pub struct SegmentCacheEntry {
    pub segment_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    header_index: HeaderIndex,
    alert_by_tray: Mutex<HashMap<String, bool>>,
}

impl SegmentCacheEntry {
    pub fn new(segment_id: &str, table: CrossSectionTable) -> Self {
        let header_index = HeaderIndex::new(&table.headers);
        Self {
            segment_id: segment_id.to_string(),
            headers: table.headers,
            rows: table.rows,
            header_index,
            alert_by_tray: Mutex::new(HashMap::new()),
        }
    }

    pub fn header_index(&self) -> &HeaderIndex {
        &self.header_index
    }

    fn memo(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.alert_by_tray.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 已记忆的纤盘告警
    pub fn tray_alert(&self, tray_range: &str) -> Option<bool> {
        self.memo().get(tray_range).copied()
    }

    pub fn set_tray_alert(&self, tray_range: &str, flag: bool) {
        self.memo().insert(tray_range.to_string(), flag);
    }
}

type Slot = Arc<OnceCell<FetchResult<Arc<SegmentCacheEntry>>>>;

// ==========================================
// SegmentCache
// ==========================================
#[derive(Debug, Default)]
pub struct SegmentCache {
    slots: Mutex<HashMap<String, Slot>>,
    fetch_count: AtomicUsize,
    scan_count: AtomicUsize,
}

impl SegmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot_for(&self, segment_id: &str) -> Slot {
        self.lock_slots()
            .entry(segment_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn ready_entry(&self, segment_id: &str) -> Option<Arc<SegmentCacheEntry>> {
        let slot = self.lock_slots().get(segment_id).cloned()?;
        match slot.get() {
            Some(Ok(entry)) => Some(Arc::clone(entry)),
            _ => None,
        }
    }

    /// 获取截面表（已缓存则直接返回, 否则抓取一次）
    ///
    /// # 返回
    /// - Ok: 缓存条目
    /// - Err: 本次或之前的抓取失败（失败同样被记忆, 不会再次抓取）
    pub async fn fetch_or_get<F>(
        &self,
        segment_id: &str,
        fetcher: &F,
    ) -> FetchResult<Arc<SegmentCacheEntry>>
    where
        F: DetailFetcher + ?Sized,
    {
        let slot = self.slot_for(segment_id);
        let result = slot
            .get_or_init(|| async {
                self.fetch_count.fetch_add(1, Ordering::SeqCst);
                match fetcher.fetch_detail(segment_id).await {
                    Ok(html) => {
                        let table = CrossSectionTable::from_markup(&html);
                        debug!(
                            segment_id,
                            headers = table.headers.len(),
                            rows = table.rows.len(),
                            "截面表已缓存"
                        );
                        Ok(Arc::new(SegmentCacheEntry::new(segment_id, table)))
                    }
                    Err(err) => {
                        warn!(segment_id, error = %err, "截面抓取失败, 本次运行不再重试");
                        Err(err)
                    }
                }
            })
            .await;
        result.clone()
    }

    /// 写入纤盘告警（segment 未缓存时忽略）
    pub fn set_tray_alert(&self, segment_id: &str, tray_range: &str, flag: bool) {
        if let Some(entry) = self.ready_entry(segment_id) {
            entry.set_tray_alert(tray_range, flag);
        }
    }

    /// 读取纤盘告警（条目或 key 不存在时为 false）
    pub fn tray_has_alert(&self, segment_id: &str, tray_range: &str) -> bool {
        self.ready_entry(segment_id)
            .and_then(|entry| entry.tray_alert(tray_range))
            .unwrap_or(false)
    }

    /// 判定纤盘告警: 已记忆则直接返回, 否则扫描一次并记忆
    ///
    /// segment 未缓存或抓取失败时为 false
    pub fn evaluate_tray(
        &self,
        segment_id: &str,
        tray_range: &str,
        evaluator: &TrayAlertEvaluator,
    ) -> bool {
        let Some(entry) = self.ready_entry(segment_id) else {
            return false;
        };

        // 持锁扫描, 同一 (segment, 纤盘) 不会并发扫描两次
        let mut memo = entry.memo();
        if let Some(flag) = memo.get(tray_range) {
            return *flag;
        }
        self.scan_count.fetch_add(1, Ordering::SeqCst);
        let flag = evaluator.evaluate_indexed(entry.header_index(), &entry.rows, tray_range);
        memo.insert(tray_range.to_string(), flag);
        flag
    }

    /// 已成功缓存的条目
    pub fn entry(&self, segment_id: &str) -> Option<Arc<SegmentCacheEntry>> {
        self.ready_entry(segment_id)
    }

    /// 记忆的抓取失败
    pub fn failure(&self, segment_id: &str) -> Option<FetchError> {
        let slot = self.lock_slots().get(segment_id).cloned()?;
        match slot.get() {
            Some(Err(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// 是否已有抓取结果（成功或失败）
    pub fn contains(&self, segment_id: &str) -> bool {
        self.lock_slots()
            .get(segment_id)
            .map_or(false, |slot| slot.initialized())
    }

    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }

    /// 清空（运行开始 / 关闭时调用）
    pub fn clear(&self) {
        let mut slots = self.lock_slots();
        if !slots.is_empty() {
            debug!(entries = slots.len(), "清空截面缓存");
        }
        slots.clear();
    }

    /// 实际发起的抓取次数（累计）
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// 实际扫描的纤盘次数（累计）
    pub fn scan_count(&self) -> usize {
        self.scan_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    const PAGE: &str = r#"<table id="GridView2">
        <tr><th>Fibre</th><th>OS Name</th><th>Bearer ID</th></tr>
        <tr><td>1</td><td>plain</td><td></td></tr>
        <tr><td>2</td><td>plain</td><td></td></tr>
        <tr><td>3</td><td>plain</td><td></td></tr>
        <tr><td>4</td><td>plain</td><td></td></tr>
        <tr><td>5</td><td>plain</td><td></td></tr>
        <tr><td>6</td><td>plain</td><td></td></tr>
        <tr><td>7</td><td>x</td><td>DWDM-LINK</td></tr>
        </table>"#;

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DetailFetcher for CountingFetcher {
        async fn fetch_detail(&self, segment_id: &str) -> FetchResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::HttpStatus {
                    segment_id: segment_id.to_string(),
                    status: 503,
                });
            }
            Ok(PAGE.to_string())
        }
    }

    #[tokio::test]
    async fn test_fetch_once_per_segment() {
        let cache = SegmentCache::new();
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0), fail: false };

        let first = cache.fetch_or_get("1001", &fetcher).await.unwrap();
        let second = cache.fetch_or_get("1001", &fetcher).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.fetch_count(), 1);
        assert_eq!(first.rows.len(), 7);
        assert!(cache.contains("1001"));
    }

    #[tokio::test]
    async fn test_failure_is_memoized() {
        let cache = SegmentCache::new();
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0), fail: true };

        assert!(cache.fetch_or_get("9", &fetcher).await.is_err());
        assert!(cache.fetch_or_get("9", &fetcher).await.is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(cache.failure("9"), Some(FetchError::HttpStatus { status: 503, .. })));
        assert!(!cache.evaluate_tray("9", "1-6", &TrayAlertEvaluator::default()));
    }

    #[tokio::test]
    async fn test_tray_alert_memo() {
        let cache = SegmentCache::new();
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0), fail: false };
        cache.fetch_or_get("1001", &fetcher).await.unwrap();

        let evaluator = TrayAlertEvaluator::default();
        assert!(!cache.evaluate_tray("1001", "1-6", &evaluator));
        assert!(cache.evaluate_tray("1001", "7-12", &evaluator));
        assert!(cache.evaluate_tray("1001", "7-12", &evaluator));
        assert_eq!(cache.scan_count(), 2);

        assert!(cache.tray_has_alert("1001", "7-12"));
        assert!(!cache.tray_has_alert("1001", "13-18"));
        assert!(!cache.tray_has_alert("missing", "7-12"));

        cache.set_tray_alert("1001", "13-18", true);
        assert!(cache.tray_has_alert("1001", "13-18"));
        assert!(cache.evaluate_tray("1001", "13-18", &evaluator));
        assert_eq!(cache.scan_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let cache = SegmentCache::new();
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0), fail: false };
        cache.fetch_or_get("1001", &fetcher).await.unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.tray_has_alert("1001", "7-12"));

        cache.fetch_or_get("1001", &fetcher).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
