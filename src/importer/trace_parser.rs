// ==========================================
// 光纤路由分析 - 明细表解析器
// ==========================================
// 职责: 原始行 → CableSegmentRecord 列表
// 输入: "Fibre Trace Details" 标记行之后的 section（首行 + 续行）
// 红线: 纯函数; 缺少标记行为致命错误, 其余问题记录为诊断
// ==========================================

use crate::domain::diagnostics::{RunDiagnostic, RunDiagnostics};
use crate::domain::trace::CableSegmentRecord;
use crate::domain::types::{DiagnosticKind, FibreType};
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// 明细标记
pub const DETAILS_MARKER: &str = "Fibre Trace Details";

/// 汇总标记
pub const SUMMARY_MARKER: &str = "Fibre Trace Summary";

// 汇总块中查找表头的最大行数
const SUMMARY_HEADER_WINDOW: usize = 10;

static SELECTED_FIBRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(#\s*(\d+)\s*\)").expect("选中纤号正则"));

// 续行指标: "890.00m, 144fibres"
static FIBRE_METRICS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*m,\s*(\d+)\s*fibres?").expect("纤芯指标正则")
});

/// 解析结果: 记录 + 字段缺省诊断
#[derive(Debug, Clone, Default)]
pub struct ParsedTrace {
    pub records: Vec<CableSegmentRecord>,
    pub diagnostics: Vec<RunDiagnostic>,
}

// ==========================================
// TraceTableParser
// ==========================================
pub struct TraceTableParser;

impl TraceTableParser {
    /// 解析明细行
    ///
    /// # 参数
    /// - rows: 原始行（CSV / Excel / 标记适配后的统一布局）
    ///
    /// # 返回
    /// - Ok(ParsedTrace): 按出现顺序的记录 + FieldDefaultError 诊断
    /// - Err(MarkerNotFound): 找不到 "Fibre Trace Details"
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub fn parse(&self, rows: &[Vec<String>]) -> ImportResult<ParsedTrace> {
        let marker_idx = rows
            .iter()
            .position(|row| row.iter().any(|cell| cell.contains(DETAILS_MARKER)))
            .ok_or_else(|| ImportError::MarkerNotFound(DETAILS_MARKER.to_string()))?;

        let body = &rows[marker_idx + 1..];
        let mut records = Vec::new();
        let mut diagnostics = RunDiagnostics::new();

        let mut i = 0;
        // 首个 section 之前: 跳过空行与表头行（首字段非整数）
        while i < body.len() {
            let row = &body[i];
            if is_blank_lead(row) || parse_sequence(&row[0]).is_none() {
                i += 1;
            } else {
                break;
            }
        }

        while i < body.len() {
            let primary = &body[i];
            if is_blank_lead(primary) {
                i += 1;
                continue;
            }

            let mut end = i + 1;
            while end < body.len() && is_blank_lead(&body[end]) {
                end += 1;
            }
            let continuation = &body[i + 1..end];

            let record = build_record(primary, continuation, records.len(), &mut diagnostics);
            records.push(record);
            i = end;
        }

        debug!(
            records = records.len(),
            diagnostics = diagnostics.len(),
            "明细解析完成"
        );

        Ok(ParsedTrace {
            records,
            diagnostics: diagnostics.into_vec(),
        })
    }
}

fn is_blank_lead(row: &[String]) -> bool {
    row.first().map_or(true, |cell| cell.trim().is_empty())
}

fn parse_sequence(cell: &str) -> Option<u32> {
    cell.trim().parse::<u32>().ok()
}

fn field(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

fn build_record(
    primary: &[String],
    continuation: &[Vec<String>],
    record_index: usize,
    diagnostics: &mut RunDiagnostics,
) -> CableSegmentRecord {
    let raw_sequence = field(primary, 0);
    let sequence = match parse_sequence(&raw_sequence) {
        Some(seq) => seq,
        None => {
            let position = (record_index + 1) as u32;
            diagnostics.record(
                DiagnosticKind::FieldDefaultError,
                record_index,
                t_with_args(
                    "diagnostics.field_default_sequence",
                    &[
                        ("value", raw_sequence.trim()),
                        ("position", &position.to_string()),
                    ],
                ),
            );
            position
        }
    };

    let cable_name = truncate_cable_name(&field(primary, 2));
    let selected_fibre = match selected_fibre_of(&cable_name) {
        Some(n) => n,
        None => {
            diagnostics.record(
                DiagnosticKind::FieldDefaultError,
                record_index,
                t_with_args(
                    "diagnostics.field_default_selected_fibre",
                    &[("cable", &cable_name)],
                ),
            );
            0
        }
    };

    CableSegmentRecord {
        sequence,
        a_end: field(primary, 1),
        cable_name,
        b_end: field(primary, 3),
        connect_disconnect: clean_connect_disconnect(&field(primary, 4)),
        exchange_owner: field(primary, 5),
        length_text: field(primary, 6),
        selected_fibre,
        total_fibres: total_fibres_of(continuation),
    }
}

/// 光缆名截断至首个 ')'（含）
///
/// "33UABLS001(#15) 890m" → "33UABLS001(#15)"
pub fn truncate_cable_name(raw: &str) -> String {
    match raw.find(')') {
        Some(idx) => raw[..=idx].to_string(),
        None => raw.to_string(),
    }
}

/// Connect/Disconnect 清洗: 首个 't' 之后若紧跟非空格字符, 删除该字符
///
/// 报表导出会在 "Connect"/"Disconnect" 与纤号之间夹一个分隔符,
/// 例如 "Connect-3:1" → "Connect3:1"
pub fn clean_connect_disconnect(raw: &str) -> String {
    let Some(t_idx) = raw.find('t') else {
        return raw.to_string();
    };
    let after = t_idx + 1;
    match raw[after..].chars().next() {
        Some(next) if next != ' ' => {
            let mut cleaned = String::with_capacity(raw.len());
            cleaned.push_str(&raw[..after]);
            cleaned.push_str(&raw[after + next.len_utf8()..]);
            cleaned
        }
        _ => raw.to_string(),
    }
}

/// 从光缆名提取 (#N)
pub fn selected_fibre_of(cable_name: &str) -> Option<u32> {
    SELECTED_FIBRE_RE
        .captures(cable_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// 续行中首个匹配 "<len>m, <N>fibres" 的单元格给出总芯数
fn total_fibres_of(continuation: &[Vec<String>]) -> Option<u32> {
    continuation
        .iter()
        .flat_map(|row| row.iter())
        .find_map(|cell| {
            FIBRE_METRICS_RE
                .captures(cell)
                .and_then(|caps| caps.get(2))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
}

/// 从 "Fibre Trace Summary" 块推断路由纤芯类型
///
/// # 规则
/// - 找到以 "Fibre Trace Summary" 开头的行
/// - 其后 10 行内找包含 "name" 的表头行
/// - 表头下一行为数据行: 字段数 ≥ 3 取第 2 列, 否则取第 1 列
/// - 名称前缀 L_ / J_ / T_ 决定类型
pub fn infer_path_fibre_type(rows: &[Vec<String>]) -> Option<FibreType> {
    let line_of = |row: &Vec<String>| row.join(",").trim().to_lowercase();

    let summary_lower = SUMMARY_MARKER.to_lowercase();
    let start = rows
        .iter()
        .position(|row| line_of(row).starts_with(&summary_lower))?;

    let window_end = (start + SUMMARY_HEADER_WINDOW).min(rows.len());
    let header_idx =
        (start + 1..window_end).find(|&j| line_of(&rows[j]).contains("name"))?;

    let data = rows.get(header_idx + 1)?;
    let name = if data.len() >= 3 {
        data.get(1)
    } else {
        data.first()
    }?;

    FibreType::from_path_name(name.trim().trim_matches('"'))
}
