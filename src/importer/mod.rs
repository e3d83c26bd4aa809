// ==========================================
// 光纤路由分析 - 导入层
// ==========================================
// 职责: 外部报表读取与明细解析
// 支持: CSV, Excel, 路由详情页 (HTML)
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod markup;
pub mod trace_markup;
pub mod trace_parser;
pub mod trace_source;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use markup::{extract_tables, MarkupCell, MarkupRow, MarkupTable};
pub use trace_markup::TraceMarkupAdapter;
pub use trace_parser::{
    infer_path_fibre_type, ParsedTrace, TraceTableParser, DETAILS_MARKER, SUMMARY_MARKER,
};
pub use trace_source::TraceSource;
