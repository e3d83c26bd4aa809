// ==========================================
// 光纤路由分析 - 路由详情页适配器
// ==========================================
// 职责: 路由详情页 (HTML) → 与 CSV 导出一致的行布局
// 布局: [汇总块] + 标记行 + 表头行 + 每条光缆 3 行（首行 / 空行 / 指标行）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::markup::{extract_tables, MarkupCell, MarkupTable};
use crate::importer::trace_parser::{DETAILS_MARKER, SUMMARY_MARKER};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, instrument};

// 明细表表头关键字（命中 ≥ 2 个即认定）
const DETAIL_KEYWORDS: [&str; 11] = [
    "A End",
    "A-End",
    "B End",
    "B-End",
    "Fibre Cable",
    "Name",
    "Connect",
    "Disconnect",
    "C/D",
    "EO",
    "Length",
];
const MIN_KEYWORD_SCORE: usize = 2;
const MIN_CONNECT_COLUMNS: usize = 5;
const FALLBACK_TABLE_ORDINAL: usize = 6; // 第 7 张表

// 表头缺失时的列位置
const DEFAULT_IDX_A: usize = 2;
const DEFAULT_IDX_NAME: usize = 3;
const DEFAULT_IDX_B: usize = 4;
const DEFAULT_IDX_CD: usize = 8;
const DEFAULT_IDX_EO: usize = 9;
const DEFAULT_IDX_LEN: usize = 10;

static KEYWORD_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DETAIL_KEYWORDS
        .iter()
        .map(|kw| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw))).expect("关键字正则"))
        .collect()
});
static CONNECT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(connect|disconnect)\b").expect("连接关键字正则"));
static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\s*:\s*\d+\b").expect("纤号对正则"));
static PAIR_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\s*:\s*\d+(\s*;\s*\d+\s*:\s*\d+)*$").expect("纤号对列表正则")
});
static SELECTOR_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(#\s*\d+\s*\)").expect("纤号标记正则"));
static EO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bEO\d+\b").expect("EO 正则"));
static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*m\b").expect("长度正则"));
static FIBRES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*fibres?\b").expect("芯数正则"));
static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("数值正则"));
static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*\bsrc\s*=\s*["']?([^"'\s>]+)"#).expect("图片 src 正则")
});
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<b\b[^>]*>(.*?)</b>").expect("粗体正则"));
static C_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bC\s*:?\s*(\d)").expect("C 简写正则"));
static D_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bD\s*:?\s*(\d)").expect("D 简写正则"));
static CONNECT_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bconnect\b").expect("Connect 正则"));
static DISCONNECT_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdisconnect\b").expect("Disconnect 正则"));
static ACTION_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Connect|Disconnect)\s+").expect("动作间隔正则"));

// ==========================================
// TraceMarkupAdapter
// ==========================================
pub struct TraceMarkupAdapter;

impl TraceMarkupAdapter {
    /// 详情页 → 行
    ///
    /// # 返回
    /// - Ok: 统一行布局（可直接交给 TraceTableParser）
    /// - Err(TraceTableNotFound): 页面中没有任何表格
    #[instrument(skip(self, html), fields(html_len = html.len()))]
    pub fn to_rows(&self, html: &str) -> ImportResult<Vec<Vec<String>>> {
        let tables = extract_tables(html);
        let table = pick_detail_table(&tables).ok_or(ImportError::TraceTableNotFound)?;

        let mut out: Vec<Vec<String>> = Vec::new();

        if let Some(name) = summary_path_name(&tables) {
            out.push(vec![SUMMARY_MARKER.to_string()]);
            out.push(vec!["No".to_string(), "Name".to_string(), "Type".to_string()]);
            out.push(vec!["1".to_string(), name, String::new()]);
            out.push(vec![String::new()]);
        }

        out.push(vec![DETAILS_MARKER.to_string()]);
        out.push(
            [
                "Cable#",
                "A-End",
                "Fibre Cable",
                "B-End",
                "Connect/Disconnect",
                "EO",
                "Length",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        );

        let (columns, start_idx) = resolve_columns(table);
        let mut seq = 0u32;

        for row in table.rows.iter().skip(start_idx) {
            if row.cells.is_empty() {
                continue;
            }
            let Some(name_cell) = row.get(columns.name) else {
                continue;
            };

            let a_end = row.get(columns.a_end).map(|c| c.first_line()).unwrap_or_default();
            let b_end = row.get(columns.b_end).map(|c| c.first_line()).unwrap_or_default();

            let name_full = name_cell.text();
            let cable = cable_text(name_cell, &name_full);
            let connect = row.get(columns.cd).map(normalize_cd).unwrap_or_default();
            let eo = row
                .get(columns.eo)
                .and_then(|c| EO_RE.find(&c.text()).map(|m| m.as_str().to_string()))
                .unwrap_or_default();

            let (max_length, total_fibres) = parse_name_block(&name_full);
            let length = row
                .get(columns.length)
                .and_then(|c| numeric_length(&c.text()))
                .or_else(|| max_length.map(|l| format!("{:.2}", l)))
                .unwrap_or_default();

            let metrics = match (max_length, total_fibres) {
                (Some(len), Some(tot)) if tot > 0 => format!("{:.2}m, {}fibres", len, tot),
                _ => String::new(),
            };

            seq += 1;
            out.push(vec![seq.to_string(), a_end, cable, b_end, connect, eo, length]);
            out.push(vec![String::new(); 7]);
            out.push(vec![
                String::new(),
                String::new(),
                metrics,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ]);
        }

        debug!(cables = seq, table_id = ?table.id, "详情页转换完成");
        Ok(out)
    }
}

// ==========================================
// 表格选择
// ==========================================

fn header_score(cells: &[String]) -> usize {
    let joined = cells.join(" | ");
    KEYWORD_RES.iter().filter(|re| re.is_match(&joined)).count()
}

/// 挑选明细表
///
/// 顺序: 表头关键字得分 ≥ 2 → 含连接信息且 ≥ 5 列 → 第 7 张表 → 行数最多
fn pick_detail_table(tables: &[MarkupTable]) -> Option<&MarkupTable> {
    if tables.is_empty() {
        return None;
    }

    let previews: Vec<Vec<Vec<String>>> = tables
        .iter()
        .map(|t| {
            t.rows
                .iter()
                .filter(|r| !r.cells.is_empty())
                .map(|r| r.texts())
                .collect()
        })
        .collect();

    let mut best: Option<(usize, usize)> = None;
    for (idx, rows) in previews.iter().enumerate() {
        let Some(header) = rows.iter().find(|r| r.iter().any(|c| !c.trim().is_empty())) else {
            continue;
        };
        let score = header_score(header);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    if let Some((idx, score)) = best {
        if score >= MIN_KEYWORD_SCORE {
            return tables.get(idx);
        }
    }

    for (idx, rows) in previews.iter().enumerate() {
        let mentions_connect = rows
            .iter()
            .flatten()
            .any(|c| CONNECT_WORD_RE.is_match(c) || PAIR_RE.is_match(c));
        let max_cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if mentions_connect && max_cols >= MIN_CONNECT_COLUMNS {
            return tables.get(idx);
        }
    }

    if tables.len() > FALLBACK_TABLE_ORDINAL {
        return tables.get(FALLBACK_TABLE_ORDINAL);
    }

    previews
        .iter()
        .enumerate()
        .max_by_key(|(idx, rows)| (rows.len(), std::cmp::Reverse(*idx)))
        .and_then(|(idx, _)| tables.get(idx))
}

// ==========================================
// 列定位
// ==========================================

struct DetailColumns {
    a_end: usize,
    name: usize,
    b_end: usize,
    cd: usize,
    eo: usize,
    length: usize,
}

/// 按表头（小写）定位列; 任一列缺失时缺失列取默认位置
///
/// # 返回
/// (列位置, 数据起始行)
fn resolve_columns(table: &MarkupTable) -> (DetailColumns, usize) {
    let header_idx = table.rows.iter().position(|row| {
        row.cells.iter().filter(|c| c.is_header).any(|c| {
            let text = c.text().to_lowercase();
            text.contains("name") || text.contains("fibre")
        })
    });

    let header_lc: Vec<String> = header_idx
        .map(|idx| {
            table.rows[idx]
                .cells
                .iter()
                .filter(|c| c.is_header)
                .map(|c| c.text().to_lowercase())
                .collect()
        })
        .unwrap_or_default();

    let idx_for = |names: &[&str]| -> Option<usize> {
        names
            .iter()
            .find_map(|name| header_lc.iter().position(|h| h == name))
    };

    let columns = DetailColumns {
        a_end: idx_for(&["a end", "a-end"]).unwrap_or(DEFAULT_IDX_A),
        name: idx_for(&["name", "fibre cable", "fibre", "fiber"]).unwrap_or(DEFAULT_IDX_NAME),
        b_end: idx_for(&["z end", "b end", "b-end"]).unwrap_or(DEFAULT_IDX_B),
        cd: idx_for(&["c/d", "connect/disconnect", "c d"]).unwrap_or(DEFAULT_IDX_CD),
        eo: idx_for(&["eo"]).unwrap_or(DEFAULT_IDX_EO),
        length: idx_for(&["length(m)", "length"]).unwrap_or(DEFAULT_IDX_LEN),
    };

    (columns, header_idx.map_or(0, |idx| idx + 1))
}

// ==========================================
// 单元格提取
// ==========================================

/// 光缆文本: 锚点文本优先; 单元格有 (#N) 而锚点文本没有时补上
fn cable_text(name_cell: &MarkupCell, name_full: &str) -> String {
    let cable = name_cell
        .anchor_text()
        .unwrap_or_else(|| name_cell.first_line());
    if name_full.contains("(#") && !cable.contains("(#") {
        if let Some(token) = SELECTOR_TOKEN_RE.find(name_full) {
            return format!("{} {}", cable.trim(), token.as_str());
        }
    }
    cable
}

/// C/D 单元格 → "Connect3:1; Disconnect289:121"
fn normalize_cd(cell: &MarkupCell) -> String {
    let from_icons = cd_from_mini_table(cell);
    if !from_icons.is_empty() {
        return from_icons;
    }
    normalize_cd_text(&cell.lines().join("; "))
}

/// 从嵌套的 C/D 小表提取: 图标 src 给出动作, <b> 给出纤号对
fn cd_from_mini_table(cell: &MarkupCell) -> String {
    let mut entries: Vec<String> = Vec::new();

    for table in extract_tables(&cell.inner_html) {
        for row in &table.rows {
            let row_html: String = row.cells.iter().map(|c| c.inner_html.as_str()).collect();
            let Some(src) = IMG_SRC_RE
                .captures(&row_html)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_lowercase())
            else {
                continue;
            };
            // "disconnect" 含 "connect", 先判断
            let action = if src.contains("disconnect") {
                "Disconnect"
            } else if src.contains("connect") {
                "Connect"
            } else {
                continue;
            };
            let pair = BOLD_RE
                .captures(&row_html)
                .and_then(|caps| caps.get(1))
                .map(|m| crate::importer::markup::clean_text(m.as_str()))
                .unwrap_or_default();
            if pair.is_empty() {
                continue;
            }
            let entry = format!("{}{}", action, pair);
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }

    entries.join("; ")
}

/// 文本形式的 C/D 归一化
///
/// - "C: 3:1" → "Connect3:1"; "D 4:2" → "Disconnect4:2"
/// - 关键字统一大小写, 去掉动作与纤号之间的空白
/// - 只有纤号对时视为 Connect
pub fn normalize_cd_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let t = C_SHORT_RE.replace_all(trimmed, "Connect${1}");
    let t = D_SHORT_RE.replace_all(&t, "Disconnect${1}");
    let t = CONNECT_CASE_RE.replace_all(&t, "Connect");
    let t = DISCONNECT_CASE_RE.replace_all(&t, "Disconnect");
    let t = ACTION_GAP_RE.replace_all(&t, "${1}").into_owned();

    if PAIR_LIST_RE.is_match(&t) {
        return PAIR_RE
            .find_iter(&t)
            .map(|m| format!("Connect{}", m.as_str().replace(' ', "")))
            .collect::<Vec<_>>()
            .join("; ");
    }
    t
}

/// 名称块中的最大长度与总芯数
fn parse_name_block(text: &str) -> (Option<f64>, Option<u32>) {
    let max_length = LENGTH_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    let total = FIBRES_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    (max_length, total)
}

fn numeric_length(text: &str) -> Option<String> {
    let raw: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if !NUMERIC_RE.is_match(&raw) {
        return None;
    }
    raw.parse::<f64>().ok().map(|v| format!("{:.2}", v))
}

// ==========================================
// 汇总名
// ==========================================

/// 汇总表中的路由名
///
/// 顺序: id 为 gvFibreTraceSummary / GridView1 的表 → 首个带 "Name" 表头的表
fn summary_path_name(tables: &[MarkupTable]) -> Option<String> {
    let by_id = tables
        .iter()
        .find(|t| t.id_ends_with("gvFibreTraceSummary"))
        .or_else(|| tables.iter().find(|t| t.id_ends_with("GridView1")));

    if let Some(table) = by_id {
        if let Some(name) = name_from_summary_table(table) {
            return Some(name);
        }
    }

    tables
        .iter()
        .filter(|t| t.rows.len() >= 2)
        .find(|t| {
            t.rows.iter().any(|r| {
                r.cells
                    .iter()
                    .any(|c| c.is_header && c.text().eq_ignore_ascii_case("name"))
            })
        })
        .and_then(name_from_summary_table)
}

fn name_from_summary_table(table: &MarkupTable) -> Option<String> {
    let first = table.rows.first()?;
    if first.has_header_cells() {
        let name_idx = first
            .cells
            .iter()
            .position(|c| c.text().eq_ignore_ascii_case("name"))?;
        return table.rows[1..]
            .iter()
            .filter_map(|r| r.get(name_idx))
            .map(|c| c.first_line())
            .find(|name| !name.is_empty());
    }

    // 无表头: 中间列为 Name
    table
        .rows
        .iter()
        .find(|r| r.cells.len() >= 3)
        .map(|r| r.cells[1].first_line())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FibreType;
    use crate::importer::trace_parser::{infer_path_fibre_type, TraceTableParser};

    const SAMPLE_PAGE: &str = r#"
        <html><body>
        <table id="MainContent_gvFibreTraceSummary">
          <tr><th>No</th><th>Name</th><th>Status</th></tr>
          <tr><td>1</td><td>T_MEL_SYD_01<br/>extra</td><td>Active</td></tr>
        </table>
        <table id="MainContent_gvFibreTrace">
          <tr><th>A End</th><th>Name</th><th>B End</th><th>C/D</th><th>EO</th><th>Length</th></tr>
          <tr>
            <td>12AJL-X<br/>1 Main St</td>
            <td><a href="/c?id=1">33UABLS001</a> (#15)<br/>0.00m, 890.00m, 144fibres</td>
            <td>34BJL-Y</td>
            <td><table><tr><td><img src="img/connect.gif"/></td><td><b>3:1</b></td></tr>
                       <tr><td><img src="img/disconnect.gif"/></td><td><b>289:121</b></td></tr></table></td>
            <td>Owner EO42 x</td>
            <td>1,234.5</td>
          </tr>
          <tr>
            <td>34BJL-Y</td>
            <td><a>FSS 7</a><br/>50m, 24fibres</td>
            <td>40BJL-Z</td>
            <td>c: 4:2</td>
            <td></td>
            <td>n/a</td>
          </tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_markup_to_rows_layout() {
        let rows = TraceMarkupAdapter.to_rows(SAMPLE_PAGE).unwrap();

        let marker = rows.iter().position(|r| r[0] == DETAILS_MARKER).unwrap();
        let first = &rows[marker + 2];
        assert_eq!(first[0], "1");
        assert_eq!(first[1], "12AJL-X");
        assert_eq!(first[2], "33UABLS001 (#15)");
        assert_eq!(first[3], "34BJL-Y");
        assert_eq!(first[4], "Connect3:1; Disconnect289:121");
        assert_eq!(first[5], "EO42");
        assert_eq!(first[6], "1234.50");
        assert_eq!(rows[marker + 4][2], "890.00m, 144fibres");

        let second = &rows[marker + 5];
        assert_eq!(second[2], "FSS 7");
        assert_eq!(second[4], "Connect4:2");
        assert_eq!(second[6], "50.00");
        assert_eq!(rows[marker + 7][2], "50.00m, 24fibres");
    }

    #[test]
    fn test_markup_rows_feed_parser() {
        let rows = TraceMarkupAdapter.to_rows(SAMPLE_PAGE).unwrap();
        let parsed = TraceTableParser.parse(&rows).unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].selected_fibre, 15);
        assert_eq!(parsed.records[0].total_fibres, Some(144));
        assert_eq!(parsed.records[1].total_fibres, Some(24));
        assert_eq!(infer_path_fibre_type(&rows), Some(FibreType::Trunk));
    }

    #[test]
    fn test_page_without_tables_is_parse_error() {
        let err = TraceMarkupAdapter.to_rows("<html><body>nothing</body></html>").unwrap_err();
        assert!(matches!(err, ImportError::TraceTableNotFound));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_normalize_cd_text() {
        assert_eq!(normalize_cd_text("3:1; 4 : 2"), "Connect3:1; Connect4:2");
        assert_eq!(normalize_cd_text("D: 5:6"), "Disconnect5:6");
        assert_eq!(normalize_cd_text("connect 7:8"), "Connect7:8");
        assert_eq!(normalize_cd_text("  "), "");
    }

    #[test]
    fn test_parse_name_block() {
        let (len, tot) = parse_name_block("0.00m, 890.00m, 312fibres, 12WK 60SP");
        assert_eq!(len, Some(890.0));
        assert_eq!(tot, Some(312));
        assert_eq!(parse_name_block("none"), (None, None));
    }
}
