// ==========================================
// 光纤路由分析 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: 参考库中的 config_kv 表 (key-value + scope), 表不存在时使用默认值
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::pipeline_config::{invalid, PipelineConfig};
use crate::db::{configure_sqlite_connection, open_sqlite_connection, table_exists};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "FIBRE_TRACE_ASSIST_DB_PATH";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// config_kv 表是否存在
    pub fn has_config_table(&self) -> ConfigResult<bool> {
        let conn = self.get_conn()?;
        Ok(table_exists(&conn, "config_kv")?)
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在（或 config_kv 表不存在）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        if !self.has_config_table()? {
            return Ok(None);
        }

        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（表不存在时创建）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// 加载运行配置: 默认值 + config_kv 覆写
    pub fn load_pipeline_config(&self) -> ConfigResult<PipelineConfig> {
        let mut config = PipelineConfig::default();
        if !self.has_config_table()? {
            debug!("config_kv 表不存在, 使用默认配置");
            return Ok(config);
        }

        if let Some(v) = self.get_global_config_value(config_keys::CROSS_SECTION_BASE_URL)? {
            config.cross_section_base_url = v.trim().to_string();
        }
        if let Some(v) = self.get_global_config_value(config_keys::REQUEST_TIMEOUT_SECS)? {
            config.request_timeout_secs = parse_value(config_keys::REQUEST_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::MAX_RETRIES)? {
            config.max_retries = parse_value(config_keys::MAX_RETRIES, &v)?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::RETRY_BACKOFF_MS)? {
            config.retry_backoff_ms = parse_value(config_keys::RETRY_BACKOFF_MS, &v)?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::FETCH_CONCURRENCY)? {
            config.fetch_concurrency = parse_value(config_keys::FETCH_CONCURRENCY, &v)?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::USER_AGENT)? {
            config.user_agent = v.trim().to_string();
        }
        if let Some(v) = self.get_global_config_value(config_keys::CRAWL_ENABLED)? {
            config.crawl_enabled = parse_bool(config_keys::CRAWL_ENABLED, &v)?;
        }
        if let Some(v) = self.get_global_config_value(config_keys::LOCALE)? {
            config.locale = v.trim().to_string();
        }
        if let Some(v) = self.get_global_config_value(config_keys::ALERT_TRUNK_PREFIX)? {
            config.alert_rules.trunk_prefix = v.trim().to_string();
        }
        if let Some(v) = self.get_global_config_value(config_keys::ALERT_RESTRICTED_BEARERS)? {
            config.alert_rules.restricted_bearers = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate()?;
        info!(
            crawl_enabled = config.crawl_enabled,
            fetch_concurrency = config.fetch_concurrency,
            locale = %config.locale,
            "运行配置已加载"
        );
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> ConfigResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| invalid(key, raw, "无法解析为数值"))
}

fn parse_bool(key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "无法解析为布尔值")),
    }
}

/// 获取默认参考库路径
///
/// # 顺序
/// - 环境变量 FIBRE_TRACE_ASSIST_DB_PATH
/// - 用户数据目录/fibre-trace-assist/reference.db
/// - ./reference.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let path = match dirs::data_dir() {
        Some(data_dir) => data_dir.join("fibre-trace-assist").join("reference.db"),
        None => PathBuf::from("./reference.db"),
    };
    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 截面抓取
    pub const CROSS_SECTION_BASE_URL: &str = "cross_section_base_url";
    pub const REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
    pub const MAX_RETRIES: &str = "max_retries";
    pub const RETRY_BACKOFF_MS: &str = "retry_backoff_ms";
    pub const FETCH_CONCURRENCY: &str = "fetch_concurrency";
    pub const USER_AGENT: &str = "user_agent";
    pub const CRAWL_ENABLED: &str = "crawl_enabled";

    // 展示语言
    pub const LOCALE: &str = "locale";

    // 告警规则
    pub const ALERT_TRUNK_PREFIX: &str = "alert_trunk_prefix";
    pub const ALERT_RESTRICTED_BEARERS: &str = "alert_restricted_bearers"; // 逗号分隔
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_config_table() {
        let manager = manager();
        assert!(!manager.has_config_table().unwrap());
        assert_eq!(manager.get_global_config_value(config_keys::LOCALE).unwrap(), None);
        assert_eq!(manager.load_pipeline_config().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_overlay_from_config_kv() {
        let manager = manager();
        manager.set_global_config_value(config_keys::FETCH_CONCURRENCY, "8").unwrap();
        manager.set_global_config_value(config_keys::CRAWL_ENABLED, "no").unwrap();
        manager.set_global_config_value(config_keys::LOCALE, "zh-CN").unwrap();
        manager
            .set_global_config_value(config_keys::ALERT_RESTRICTED_BEARERS, "OTS, DWDM ,SDH")
            .unwrap();

        let config = manager.load_pipeline_config().unwrap();
        assert_eq!(config.fetch_concurrency, 8);
        assert!(!config.crawl_enabled);
        assert_eq!(config.locale, "zh-CN");
        assert_eq!(config.alert_rules.restricted_bearers, vec!["OTS", "DWDM", "SDH"]);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_invalid_value_is_error() {
        let manager = manager();
        manager.set_global_config_value(config_keys::MAX_RETRIES, "many").unwrap();
        let err = manager.load_pipeline_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
    }
}
