// ==========================================
// 光纤路由分析 - 输入源
// ==========================================
// 职责: 隔离输入格式（原始行 / 详情页标记）
// 约定: 两种输入在解析前统一为同一行布局
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{decode_text, UniversalFileParser};
use crate::importer::trace_markup::TraceMarkupAdapter;
use std::path::Path;
use tracing::info;

/// 路由报表输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    /// 已读取的原始行（CSV / Excel）
    Rows(Vec<Vec<String>>),
    /// 路由详情页 HTML
    Markup(String),
}

impl TraceSource {
    /// 按扩展名读取文件
    ///
    /// # 参数
    /// - path: .csv / .xlsx / .xls / .html / .htm
    ///
    /// # 返回
    /// - Err(FileNotFound / UnsupportedFormat / 读取失败)
    pub fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let source = match ext.as_str() {
            "html" | "htm" => {
                let bytes = std::fs::read(path)?;
                TraceSource::Markup(decode_text(bytes))
            }
            "csv" | "xlsx" | "xls" => TraceSource::Rows(UniversalFileParser.parse(path)?),
            other => return Err(ImportError::UnsupportedFormat(other.to_string())),
        };

        info!(path = %path.display(), kind = source.kind(), "输入源已加载");
        Ok(source)
    }

    /// 输入类别（日志用）
    pub fn kind(&self) -> &'static str {
        match self {
            TraceSource::Rows(_) => "rows",
            TraceSource::Markup(_) => "markup",
        }
    }

    /// 统一为原始行
    pub fn into_rows(self) -> ImportResult<Vec<Vec<String>>> {
        match self {
            TraceSource::Rows(rows) => Ok(rows),
            TraceSource::Markup(html) => TraceMarkupAdapter.to_rows(&html),
        }
    }
}
