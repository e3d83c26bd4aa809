// ==========================================
// 光纤路由分析 - 运行编排器
// ==========================================
// 用途: 协调 解析 → 分类 → 纤盘 → 查询 → 抓取 → 告警 → 建议 → 奇偶
// 生命周期: 每次 run 开始时清空缓存, 关闭 / 析构时再次清空
// 红线: 只有解析 / 读取错误中止运行, 其余问题进入诊断
// ==========================================

use crate::cache::SegmentCache;
use crate::config::PipelineConfig;
use crate::crawler::{DetailFetcher, FetchError, FetchResult};
use crate::domain::diagnostics::RunDiagnostics;
use crate::domain::reference::{CableReference, SpliceCaseReference};
use crate::domain::trace::{FetchStats, TraceResultRow, TraceRunReport, TrayRange};
use crate::domain::types::{DiagnosticKind, FibreType};
use crate::engine::advisory::{splice_key, AdvisoryEngine, AdvisoryInput, SpliceFacts};
use crate::engine::alert_evaluator::TrayAlertEvaluator;
use crate::engine::parity::{is_parity_mismatch, majority_parity};
use crate::engine::tray_mapper::TrayMapper;
use crate::engine::tube_classifier::TubeClassifier;
use crate::i18n::t_with_args;
use crate::importer::error::ImportResult;
use crate::importer::trace_parser::{infer_path_fibre_type, TraceTableParser};
use crate::importer::trace_source::TraceSource;
use crate::repository::ReferenceLookup;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// CancelFlag - 协作式取消
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ==========================================
// TracePipeline
// ==========================================
pub struct TracePipeline<L, F>
where
    L: ReferenceLookup + ?Sized,
    F: DetailFetcher + ?Sized,
{
    lookup: Arc<L>,
    fetcher: Arc<F>,
    config: PipelineConfig,
    cache: SegmentCache,
    classifier: TubeClassifier,
    evaluator: TrayAlertEvaluator,
    advisory: AdvisoryEngine,
    cancel: CancelFlag,
    fibre_type_override: Option<FibreType>,
}

impl<L, F> TracePipeline<L, F>
where
    L: ReferenceLookup + ?Sized,
    F: DetailFetcher + ?Sized,
{
    /// 创建编排器
    ///
    /// # 参数
    /// - lookup: 参考库（未配置时传 NoReferenceLookup）
    /// - fetcher: 截面抓取器
    /// - config: 运行配置
    pub fn new(lookup: Arc<L>, fetcher: Arc<F>, config: PipelineConfig) -> Self {
        Self {
            evaluator: TrayAlertEvaluator::new(config.alert_rules.clone()),
            lookup,
            fetcher,
            config,
            cache: SegmentCache::new(),
            classifier: TubeClassifier::new(),
            advisory: AdvisoryEngine::new(),
            cancel: CancelFlag::new(),
            fibre_type_override: None,
        }
    }

    /// 使用外部取消标记（例如 Ctrl-C）
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// 指定路由纤芯类型（覆盖自动推断）
    pub fn with_fibre_type(mut self, fibre_type: Option<FibreType>) -> Self {
        self.fibre_type_override = fibre_type;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SegmentCache {
        &self.cache
    }

    /// 执行一次完整分析
    ///
    /// # 返回
    /// - Ok(TraceRunReport): 结果行按记录顺序; 取消时只含已处理的行
    /// - Err(ImportError): 读取失败或缺少明细标记
    #[instrument(skip(self, source), fields(source_kind = source.kind()))]
    pub async fn run(&self, source: TraceSource) -> ImportResult<TraceRunReport> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, "开始分析光纤路由");

        // ==========================================
        // 步骤1: 清空缓存与诊断
        // ==========================================
        self.cache.clear();
        let mut diagnostics = RunDiagnostics::new();
        let reference_available = self.lookup.is_available();
        if !reference_available {
            warn!("参考库不可用, 跳过 segment 查询与参考库建议");
        }

        // ==========================================
        // 步骤2: 输入统一为原始行并解析
        // ==========================================
        let raw_rows = source.into_rows()?;
        let parsed = TraceTableParser.parse(&raw_rows)?;
        diagnostics.extend(parsed.diagnostics);
        let records = parsed.records;

        // ==========================================
        // 步骤3: 路由纤芯类型
        // ==========================================
        let path_fibre_type = self
            .fibre_type_override
            .or_else(|| infer_path_fibre_type(&raw_rows));
        debug!(?path_fibre_type, records = records.len(), "步骤3: 纤芯类型已确定");

        // ==========================================
        // 步骤4: 束管分类 + 纤盘映射（顺序执行）
        // ==========================================
        let mut cancelled = false;
        let mut mapper = TrayMapper::new();
        let mut rows: Vec<TraceResultRow> = Vec::with_capacity(records.len());
        let mut trays: Vec<TrayRange> = Vec::with_capacity(records.len());

        for record in &records {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let tube = self.classifier.classify_record(record);
            let tray = mapper.map_next(record);
            rows.push(TraceResultRow::new(record, tube, &tray));
            trays.push(tray);
        }
        let processed = &records[..rows.len()];

        // ==========================================
        // 步骤5: 可见纤盘查询 segment id（按光缆键记忆）
        // ==========================================
        let mut segment_memo: HashMap<String, Option<String>> = HashMap::new();
        for (idx, record) in processed.iter().enumerate() {
            if !trays[idx].visible {
                continue;
            }
            let key = record.cable_key().to_string();
            let segment_id = match segment_memo.get(&key) {
                Some(cached) => cached.clone(),
                None if !reference_available => None,
                None => {
                    let resolved = match self.lookup.lookup_segment_id(&key) {
                        Ok(found) => found,
                        Err(err) => {
                            warn!(cable = %key, error = %err, "segment 查询失败");
                            diagnostics.record(
                                DiagnosticKind::LookupMiss,
                                idx,
                                t_with_args(
                                    "diagnostics.lookup_failed",
                                    &[("cable", &key), ("error", &err.localized())],
                                ),
                            );
                            segment_memo.insert(key.clone(), None);
                            continue;
                        }
                    };
                    segment_memo.insert(key.clone(), resolved.clone());
                    resolved
                }
            };

            match segment_id {
                Some(id) => rows[idx].segment_id = Some(id),
                None => diagnostics.record(
                    DiagnosticKind::LookupMiss,
                    idx,
                    t_with_args("diagnostics.lookup_miss", &[("cable", &key)]),
                ),
            }
        }

        // ==========================================
        // 步骤6: 按 segment 去重并发抓取截面
        // ==========================================
        let mut seen = HashSet::new();
        let segment_ids: Vec<String> = rows
            .iter()
            .filter_map(|row| row.segment_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut fetch_stats = FetchStats {
            segments_requested: segment_ids.len(),
            ..FetchStats::default()
        };

        if self.config.crawl_enabled && !segment_ids.is_empty() {
            let fetches_before = self.cache.fetch_count();
            let concurrency = self.config.fetch_concurrency.max(1);

            let outcomes: HashMap<String, FetchResult<()>> =
                stream::iter(segment_ids.iter().cloned())
                    .map(|segment_id| async move {
                        if self.cancel.is_cancelled() {
                            let err = FetchError::Cancelled(segment_id.clone());
                            return (segment_id, Err(err));
                        }
                        let result = self
                            .cache
                            .fetch_or_get(&segment_id, self.fetcher.as_ref())
                            .await
                            .map(|_| ());
                        (segment_id, result)
                    })
                    .buffer_unordered(concurrency)
                    .collect()
                    .await;

            // 按首次出现顺序记录诊断
            for segment_id in &segment_ids {
                match outcomes.get(segment_id) {
                    Some(Err(FetchError::Cancelled(_))) => {
                        cancelled = true;
                        fetch_stats.skipped += 1;
                        diagnostics.segment(
                            DiagnosticKind::FetchError,
                            segment_id,
                            t_with_args("diagnostics.fetch_cancelled", &[("segment", segment_id)]),
                        );
                    }
                    Some(Err(err)) => {
                        fetch_stats.failed += 1;
                        diagnostics.segment(
                            DiagnosticKind::FetchError,
                            segment_id,
                            t_with_args(
                                "diagnostics.fetch_failed",
                                &[("segment", segment_id), ("error", &err.localized())],
                            ),
                        );
                    }
                    _ => {}
                }
            }
            fetch_stats.fetched = self.cache.fetch_count() - fetches_before;
            info!(
                requested = fetch_stats.segments_requested,
                fetched = fetch_stats.fetched,
                failed = fetch_stats.failed,
                skipped = fetch_stats.skipped,
                "步骤6: 截面抓取完成"
            );
        }

        // ==========================================
        // 步骤7: 纤盘告警（按 segment + 纤盘记忆）
        // ==========================================
        for (row, tray) in rows.iter_mut().zip(trays.iter()) {
            if let Some(segment_id) = &row.segment_id {
                row.alert_flag =
                    self.cache
                        .evaluate_tray(segment_id, &tray.range_key(), &self.evaluator);
            }
        }

        // ==========================================
        // 步骤8: 参考库建议
        // ==========================================
        let mut cable_memo: HashMap<String, Option<CableReference>> = HashMap::new();
        let mut splice_memo: HashMap<String, Option<SpliceCaseReference>> = HashMap::new();

        for (row, record) in rows.iter_mut().zip(processed.iter()) {
            let cable_key = record.cable_key();
            let cable = if reference_available {
                cable_memo
                    .entry(cable_key.to_string())
                    .or_insert_with(|| self.find_cable(cable_key))
                    .clone()
            } else {
                None
            };

            let splice_ref = if record.has_connect_disconnect() && reference_available {
                let key = splice_key(&record.b_end);
                Some(
                    splice_memo
                        .entry(key.to_string())
                        .or_insert_with(|| self.find_splice_case(key))
                        .clone(),
                )
            } else {
                None
            };
            let splice = match &splice_ref {
                None => SpliceFacts::NotRequired,
                Some(None) => SpliceFacts::Missing,
                Some(Some(found)) => SpliceFacts::Found(found),
            };

            let advisory = self.advisory.evaluate(&AdvisoryInput {
                cable_key,
                tube: row.tube_category,
                alert: row.alert_flag,
                cable: cable.as_ref(),
                splice,
                path_type: path_fibre_type,
            });
            row.commentary = advisory.commentary;
            row.rs_type = advisory.rs_type;
            row.iof = advisory.iof;
            row.tube_mismatch = advisory.tube_mismatch;
        }

        // ==========================================
        // 步骤9: 奇偶统计 + 报告
        // ==========================================
        let selected: Vec<u32> = processed.iter().map(|r| r.selected_fibre).collect();
        let parity = majority_parity(&selected);
        for row in rows.iter_mut() {
            row.parity_mismatch = is_parity_mismatch(row.selected_fibre, parity);
        }

        let report = TraceRunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            path_fibre_type,
            rows,
            diagnostics: diagnostics.into_vec(),
            parity,
            fetch_stats,
            cancelled,
        };

        info!(
            run_id = %report.run_id,
            rows = report.rows.len(),
            alerts = report.alert_count(),
            diagnostics = report.diagnostics.len(),
            cancelled = report.cancelled,
            "光纤路由分析完成"
        );
        Ok(report)
    }

    /// 关闭: 清空缓存
    pub fn shutdown(&self) {
        self.cache.clear();
    }

    fn find_cable(&self, key: &str) -> Option<CableReference> {
        self.lookup.find_cable(key).unwrap_or_else(|err| {
            warn!(cable = %key, error = %err, "光缆参考查询失败");
            None
        })
    }

    fn find_splice_case(&self, key: &str) -> Option<SpliceCaseReference> {
        self.lookup.find_splice_case(key).unwrap_or_else(|err| {
            warn!(splice = %key, error = %err, "接头盒参考查询失败");
            None
        })
    }
}

impl<L, F> Drop for TracePipeline<L, F>
where
    L: ReferenceLookup + ?Sized,
    F: DetailFetcher + ?Sized,
{
    fn drop(&mut self) {
        self.cache.clear();
    }
}
