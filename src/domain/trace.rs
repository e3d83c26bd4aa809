// ==========================================
// 光纤路由分析 - 光纤段领域模型
// ==========================================
// 职责: 光纤段记录 / 纤盘范围 / 运行结果行 / 运行报告
// 红线: CableSegmentRecord 由解析器创建后不可变
// ==========================================

use crate::domain::diagnostics::RunDiagnostic;
use crate::domain::types::{FibreType, Parity, TubeCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 纤盘宽度（每盘 6 芯）
pub const TRAY_SIZE: u32 = 6;

// ==========================================
// CableSegmentRecord - 光纤段记录
// ==========================================
// 来源: TraceTableParser，每个 section 的首行 + 续行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableSegmentRecord {
    pub sequence: u32,             // Cable#
    pub a_end: String,             // A-End
    pub cable_name: String,        // Fibre Cable (截断至首个 ')')
    pub b_end: String,             // B-End
    pub connect_disconnect: String, // Connect/Disconnect (已清洗)
    pub exchange_owner: String,    // EO
    pub length_text: String,       // Length (原样)
    pub selected_fibre: u32,       // (#N)，缺失为 0
    pub total_fibres: Option<u32>, // 续行 "<len>m, <N>fibres"，缺失为 None
}

impl CableSegmentRecord {
    /// Connect/Disconnect 是否非空（去除首尾空白后）
    pub fn has_connect_disconnect(&self) -> bool {
        !self.connect_disconnect.trim().is_empty()
    }

    /// 参考库查询用的光缆键: 截断至首个 '(' 并去除空白
    ///
    /// 例如 "33UABLS001(#15)" → "33UABLS001"
    pub fn cable_key(&self) -> &str {
        match self.cable_name.find('(') {
            Some(idx) => self.cable_name[..idx].trim(),
            None => self.cable_name.trim(),
        }
    }
}

// ==========================================
// TrayRange - 纤盘范围
// ==========================================
// 不变量: start = 6k+1, end = start+5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrayRange {
    pub start: u32,
    pub end: u32,
    pub visible: bool,
}

impl TrayRange {
    /// 按选中纤号计算纤盘（不含可见性判定）
    ///
    /// selected_fibre = 0 视为第 1 芯
    pub fn for_fibre(selected_fibre: u32) -> Self {
        let position = selected_fibre.max(1);
        let start = ((position - 1) / TRAY_SIZE) * TRAY_SIZE + 1;
        Self {
            start,
            end: start + TRAY_SIZE - 1,
            visible: false,
        }
    }

    /// 设置可见性
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// 纤盘键 "start-end"（与可见性无关，用于缓存 memo）
    pub fn range_key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// 展示值: 可见为 "start-end"，隐藏为空串
    pub fn display(&self) -> String {
        if self.visible {
            self.range_key()
        } else {
            String::new()
        }
    }

    /// 纤号是否落在本盘内
    pub fn contains(&self, fibre: u32) -> bool {
        fibre >= self.start && fibre <= self.end
    }
}

impl fmt::Display for TrayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

// ==========================================
// TraceResultRow - 对外输出的结果行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResultRow {
    // ===== 原始字段 =====
    pub sequence: u32,
    pub a_end: String,
    pub cable_name: String,
    pub b_end: String,
    pub connect_disconnect: String,
    pub exchange_owner: String,
    pub length_text: String,
    pub selected_fibre: u32,
    pub total_fibres: Option<u32>,

    // ===== 派生字段 =====
    pub tube_category: TubeCategory,
    pub tray_range: String, // 隐藏纤盘为空串
    pub alert_flag: bool,   // 纤盘内存在 DWDM/干线电路
    pub segment_id: Option<String>,

    // ===== 参考库建议 =====
    pub rs_type: String,
    pub iof: bool,
    pub tube_mismatch: bool,
    pub parity_mismatch: bool, // 选中纤号奇偶与本次多数不一致
    pub commentary: Vec<String>,
}

impl TraceResultRow {
    /// 由记录 + 分类 + 纤盘构建（告警与建议由后续阶段填充）
    pub fn new(record: &CableSegmentRecord, tube: TubeCategory, tray: &TrayRange) -> Self {
        Self {
            sequence: record.sequence,
            a_end: record.a_end.clone(),
            cable_name: record.cable_name.clone(),
            b_end: record.b_end.clone(),
            connect_disconnect: record.connect_disconnect.clone(),
            exchange_owner: record.exchange_owner.clone(),
            length_text: record.length_text.clone(),
            selected_fibre: record.selected_fibre,
            total_fibres: record.total_fibres,
            tube_category: tube,
            tray_range: tray.display(),
            alert_flag: false,
            segment_id: None,
            rs_type: String::new(),
            iof: false,
            tube_mismatch: false,
            parity_mismatch: false,
            commentary: Vec::new(),
        }
    }
}

// ==========================================
// FetchStats - 截面抓取统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub segments_requested: usize, // 去重后的 segment 数
    pub fetched: usize,            // 实际发起的抓取次数
    pub failed: usize,             // 抓取失败数
    pub skipped: usize,            // 因取消而跳过
}

// ==========================================
// TraceRunReport - 一次运行的完整输出
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub path_fibre_type: Option<FibreType>,
    pub rows: Vec<TraceResultRow>,
    pub diagnostics: Vec<RunDiagnostic>,
    pub parity: Option<Parity>,
    pub fetch_stats: FetchStats,
    pub cancelled: bool,
}

impl TraceRunReport {
    /// 告警行数
    pub fn alert_count(&self) -> usize {
        self.rows.iter().filter(|r| r.alert_flag).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cable: &str) -> CableSegmentRecord {
        CableSegmentRecord {
            sequence: 1,
            a_end: "A".to_string(),
            cable_name: cable.to_string(),
            b_end: "B".to_string(),
            connect_disconnect: String::new(),
            exchange_owner: String::new(),
            length_text: String::new(),
            selected_fibre: 0,
            total_fibres: None,
        }
    }

    #[test]
    fn test_tray_range_for_fibre() {
        let tray = TrayRange::for_fibre(37);
        assert_eq!((tray.start, tray.end), (37, 42));

        let tray = TrayRange::for_fibre(36);
        assert_eq!((tray.start, tray.end), (31, 36));

        // 0 按第 1 芯处理
        let tray = TrayRange::for_fibre(0);
        assert_eq!((tray.start, tray.end), (1, 6));
    }

    #[test]
    fn test_tray_start_invariant() {
        for fibre in 1..=432u32 {
            let tray = TrayRange::for_fibre(fibre);
            assert_eq!(tray.start % TRAY_SIZE, 1, "fibre={}", fibre);
            assert!(tray.contains(fibre), "fibre={}", fibre);
            assert_eq!(tray.end, tray.start + 5);
        }
    }

    #[test]
    fn test_tray_display_hidden_is_empty() {
        let tray = TrayRange::for_fibre(8);
        assert_eq!(tray.display(), "");
        assert_eq!(tray.range_key(), "7-12");
        assert_eq!(tray.with_visibility(true).display(), "7-12");
    }

    #[test]
    fn test_cable_key() {
        assert_eq!(record("33UABLS001(#15)").cable_key(), "33UABLS001");
        assert_eq!(record(" 33UABLS001 ").cable_key(), "33UABLS001");
        assert_eq!(record("FSS 12 (#3)").cable_key(), "FSS 12");
    }
}
