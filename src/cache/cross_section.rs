// ==========================================
// 光纤路由分析 - 截面表解析
// ==========================================
// 职责: 截面详情页 → (表头, 数据行)
// 规则:
// - 优先 id 为 GridView2（或以 GridView2 结尾）的表, 否则取最大的表
// - 首行为 th 时作为表头, 否则按最宽行生成 Col 1..Col N
// - 数据行按表头宽度补齐或截断
// - 页面无表格时返回空表
// ==========================================

use crate::importer::markup::{extract_tables, MarkupTable};
use serde::{Deserialize, Serialize};

/// 截面表 id
pub const CROSS_SECTION_TABLE_ID: &str = "GridView2";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSectionTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CrossSectionTable {
    /// 从详情页标记解析
    pub fn from_markup(html: &str) -> Self {
        let tables = extract_tables(html);
        let picked = tables
            .iter()
            .find(|t| t.id_ends_with(CROSS_SECTION_TABLE_ID))
            .or_else(|| largest_table(&tables));

        match picked {
            Some(table) => Self::from_table(table),
            None => Self::default(),
        }
    }

    fn from_table(table: &MarkupTable) -> Self {
        let mut body = table.rows.iter().filter(|r| !r.cells.is_empty()).peekable();

        let headers: Vec<String> = match body.peek() {
            Some(first) if first.has_header_cells() => {
                let headers = first
                    .cells
                    .iter()
                    .filter(|c| c.is_header)
                    .map(|c| c.text())
                    .collect();
                body.next();
                headers
            }
            _ => {
                let width = table.max_width();
                (1..=width).map(|i| format!("Col {}", i)).collect()
            }
        };

        let width = headers.len();
        let rows = body
            .map(|row| {
                let mut values = row.texts();
                if width > 0 {
                    values.resize(width, String::new());
                }
                values
            })
            .collect();

        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

fn largest_table(tables: &[MarkupTable]) -> Option<&MarkupTable> {
    tables
        .iter()
        .enumerate()
        .max_by_key(|(idx, t)| (t.cell_count(), std::cmp::Reverse(*idx)))
        .map(|(_, t)| t)
}
