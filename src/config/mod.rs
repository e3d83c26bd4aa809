// ==========================================
// 光纤路由分析 - 配置层
// ==========================================
// 职责: 运行配置管理,支持默认值 → config_kv → 命令行 多级覆写
// 存储: 参考库 config_kv 表（可选）
// ==========================================

pub mod config_manager;
pub mod error;
pub mod pipeline_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, get_default_db_path, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use pipeline_config::PipelineConfig;
