// ==========================================
// 光纤路由分析 - 核心库
// ==========================================
// 输入: 光纤路由报表（CSV / Excel / 详情页 HTML）
// 输出: 每段光缆的束管分类、纤盘可见性、截面告警与参考库建议
// 系统定位: 规划辅助工具 (人工最终决策)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 报表读取与解析
pub mod importer;

// 引擎层 - 分类 / 纤盘 / 告警 / 建议 / 编排
pub mod engine;

// 截面缓存层
pub mod cache;

// 截面抓取层
pub mod crawler;

// 数据仓储层 - 参考库
pub mod repository;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CableSegmentRecord, DiagnosticKind, FetchStats, FibreType, Parity, RunDiagnostic,
    TraceResultRow, TraceRunReport, TrayRange, TubeCategory,
};

// 引擎
pub use engine::{CancelFlag, TracePipeline, TrayAlertEvaluator, TrayMapper, TubeClassifier};

// 导入
pub use importer::{ImportError, TraceSource, TraceTableParser};

// 缓存 / 抓取 / 参考库
pub use cache::SegmentCache;
pub use crawler::{DetailFetcher, DisabledFetcher, FetchError, HttpDetailFetcher};
pub use repository::{NoReferenceLookup, ReferenceLookup, SqliteReferenceRepository};

// 配置
pub use config::{ConfigManager, PipelineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Fibre Trace Assist";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
