// ==========================================
// 光纤路由分析 - 引擎层
// ==========================================
// 职责: 束管分类 / 纤盘映射 / 告警判定 / 建议生成 / 运行编排
// 红线: Engine 不拼 SQL, 分类与映射为纯函数
// ==========================================

pub mod advisory;
pub mod alert_evaluator;
pub mod parity;
pub mod pipeline;
pub mod tray_mapper;
pub mod tube_classifier;

// 重导出核心引擎
pub use advisory::{Advisory, AdvisoryEngine, AdvisoryInput, SpliceFacts};
pub use alert_evaluator::{AlertRules, HeaderIndex, TrayAlertEvaluator};
pub use parity::{is_parity_mismatch, majority_parity};
pub use pipeline::{CancelFlag, TracePipeline};
pub use tray_mapper::TrayMapper;
pub use tube_classifier::{EndpointType, TubeClassifier};
