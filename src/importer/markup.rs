// ==========================================
// 光纤路由分析 - 标记文本表格提取
// ==========================================
// 职责: 从 HTML 页面中提取 <table>/<tr>/<td>/<th> 结构
// 支持: 嵌套表格（单元格内的小表格独立成表，同时保留在单元格原文中）
// 红线: 只关心表格结构，不做页面渲染语义
// ==========================================

use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(/?)(table|tr|td|th)\b([^>]*)>").expect("表格标签正则")
});
static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bid\s*=\s*["']?([^"'\s>]+)"#).expect("id 属性正则"));
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script>|<style\b.*?</style>").expect("注释/脚本正则")
});
static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("标签正则"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("空白正则"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("实体正则")
});
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("锚点正则"));
static RS_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*class\s*=\s*["'][^"']*\brs\b[^"']*["'][^>]*>.*?</span>"#)
        .expect("rs span 正则")
});

// ==========================================
// 表格结构
// ==========================================

/// 单元格（保留原始内层标记，文本按需提取）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupCell {
    pub is_header: bool,
    pub inner_html: String,
}

impl MarkupCell {
    /// 单元格全文（去标签、解码实体、合并空白）
    pub fn text(&self) -> String {
        clean_text(&self.inner_html)
    }

    /// 单元格首行文本（遇到任意标签即换行，取首个非空行）
    pub fn first_line(&self) -> String {
        first_line_text(&self.inner_html)
    }

    /// 单元格文本行
    pub fn lines(&self) -> Vec<String> {
        text_lines(&self.inner_html)
    }

    /// 首个 <a> 的文本
    pub fn anchor_text(&self) -> Option<String> {
        ANCHOR_RE
            .captures(&self.inner_html)
            .and_then(|caps| caps.get(1))
            .map(|m| clean_text(m.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupRow {
    pub cells: Vec<MarkupCell>,
}

impl MarkupRow {
    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.text()).collect()
    }

    pub fn has_header_cells(&self) -> bool {
        self.cells.iter().any(|c| c.is_header)
    }

    pub fn get(&self, idx: usize) -> Option<&MarkupCell> {
        self.cells.get(idx)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupTable {
    pub id: Option<String>,
    pub rows: Vec<MarkupRow>,
}

impl MarkupTable {
    /// 最宽行的单元格数
    pub fn max_width(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// 单元格总数（用于"最大表格"兜底选择）
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    /// id 是否以给定后缀结尾（ASP.NET 会加 MainContent_ 之类前缀）
    pub fn id_ends_with(&self, suffix: &str) -> bool {
        self.id
            .as_deref()
            .map(|id| id.to_lowercase().ends_with(&suffix.to_lowercase()))
            .unwrap_or(false)
    }
}

// ==========================================
// 提取
// ==========================================

struct Frame {
    table: usize,
    row_open: bool,
    cell: Option<(bool, usize)>, // (是否 th, 内容起始偏移)
}

fn close_cell(frame: &mut Frame, tables: &mut [MarkupTable], end: usize, html: &str) {
    if let Some((is_header, start)) = frame.cell.take() {
        if let Some(row) = tables[frame.table].rows.last_mut() {
            let inner = html.get(start..end).unwrap_or("").to_string();
            row.cells.push(MarkupCell {
                is_header,
                inner_html: inner,
            });
        }
    }
}

/// 提取页面中的全部表格（按开标签出现顺序）
///
/// 容错:
/// - 未闭合的 <td>/<tr> 在遇到下一个同级标签时隐式闭合
/// - 行外的 <td> 隐式开一行
/// - 未闭合的 <table> 在文末闭合
pub fn extract_tables(raw_html: &str) -> Vec<MarkupTable> {
    let html = NOISE_RE.replace_all(raw_html, "").into_owned();
    let mut tables: Vec<MarkupTable> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for caps in TAG_RE.captures_iter(&html) {
        let Some(tag_match) = caps.get(0) else {
            continue;
        };
        let closing = caps.get(1).map_or(false, |m| !m.as_str().is_empty());
        let tag = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let attrs = caps.get(3).map_or("", |m| m.as_str());

        match (closing, tag.as_str()) {
            (false, "table") => {
                let id = ID_ATTR_RE
                    .captures(attrs)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
                tables.push(MarkupTable {
                    id,
                    rows: Vec::new(),
                });
                stack.push(Frame {
                    table: tables.len() - 1,
                    row_open: false,
                    cell: None,
                });
            }
            (true, "table") => {
                if let Some(mut frame) = stack.pop() {
                    close_cell(&mut frame, &mut tables, tag_match.start(), &html);
                }
            }
            (false, "tr") => {
                if let Some(frame) = stack.last_mut() {
                    close_cell(frame, &mut tables, tag_match.start(), &html);
                    tables[frame.table].rows.push(MarkupRow::default());
                    frame.row_open = true;
                }
            }
            (true, "tr") => {
                if let Some(frame) = stack.last_mut() {
                    close_cell(frame, &mut tables, tag_match.start(), &html);
                    frame.row_open = false;
                }
            }
            (false, cell_tag) => {
                if let Some(frame) = stack.last_mut() {
                    close_cell(frame, &mut tables, tag_match.start(), &html);
                    if !frame.row_open {
                        tables[frame.table].rows.push(MarkupRow::default());
                        frame.row_open = true;
                    }
                    frame.cell = Some((cell_tag == "th", tag_match.end()));
                }
            }
            (true, _) => {
                if let Some(frame) = stack.last_mut() {
                    close_cell(frame, &mut tables, tag_match.start(), &html);
                }
            }
        }
    }

    // 文末仍未闭合的表格
    while let Some(mut frame) = stack.pop() {
        close_cell(&mut frame, &mut tables, html.len(), &html);
    }

    tables
}

// ==========================================
// 文本清洗
// ==========================================

/// 解码常见 HTML 实体
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = match body {
                "nbsp" => Some(' '),
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if body.starts_with("#x") || body.starts_with("#X") => {
                    u32::from_str_radix(&body[2..], 16).ok().and_then(char::from_u32)
                }
                _ if body.starts_with('#') => body[1..].parse::<u32>().ok().and_then(char::from_u32),
                _ => None,
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// 合并空白（含 \u{a0}）并去除首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    WS_RE
        .replace_all(&text.replace('\u{a0}', " "), " ")
        .trim()
        .to_string()
}

/// 标记 → 纯文本
pub fn clean_text(inner_html: &str) -> String {
    let stripped = ANY_TAG_RE.replace_all(inner_html, " ");
    collapse_whitespace(&decode_entities(&stripped))
}

/// 标记 → 文本行（每个标签视为换行, 丢弃空行）
pub fn text_lines(inner_html: &str) -> Vec<String> {
    let lined = ANY_TAG_RE.replace_all(inner_html, "\n");
    decode_entities(&lined)
        .split('\n')
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

/// 标记 → 首个非空文本行（跳过 class="rs" 的 span）
pub fn first_line_text(inner_html: &str) -> String {
    let without_rs = RS_SPAN_RE.replace_all(inner_html, "");
    text_lines(&without_rs).into_iter().next().unwrap_or_default()
}
