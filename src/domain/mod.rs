// ==========================================
// 光纤路由分析 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod diagnostics;
pub mod reference;
pub mod trace;
pub mod types;

// 重导出核心类型
pub use diagnostics::{RunDiagnostic, RunDiagnostics};
pub use reference::{CableReference, SpliceCaseReference};
pub use trace::{
    CableSegmentRecord, FetchStats, TraceResultRow, TraceRunReport, TrayRange, TRAY_SIZE,
};
pub use types::{DiagnosticKind, FibreType, Parity, TubeCategory};
