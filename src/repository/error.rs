// ==========================================
// 光纤路由分析 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 参考库错误不会中止运行, 由 Pipeline 记录为 LookupMiss 诊断
// ==========================================

use crate::i18n::{t, t_with_args};
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with name={name}")]
    NotFound { entity: String, name: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("参考表缺失: {0}")]
    MissingTable(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                name: "Unknown".to_string(),
            },
            other => {
                let msg = other.to_string();
                if msg.contains("no such table") {
                    RepositoryError::MissingTable(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
        }
    }
}

impl RepositoryError {
    /// 按当前语言输出的错误原因（写入诊断）
    pub fn localized(&self) -> String {
        let (key, detail) = match self {
            RepositoryError::NotFound { .. } => return t("errors.repository.not_found"),
            RepositoryError::DatabaseConnectionError(d) => ("errors.repository.connection", d.clone()),
            RepositoryError::LockError(d) => ("errors.repository.lock", d.clone()),
            RepositoryError::DatabaseQueryError(d) => ("errors.repository.query", d.clone()),
            RepositoryError::MissingTable(d) => ("errors.repository.missing_table", d.clone()),
            RepositoryError::InternalError(d) => ("errors.repository.internal", d.clone()),
            RepositoryError::Other(e) => ("errors.repository.internal", e.to_string()),
        };
        t_with_args(key, &[("detail", &detail)])
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::tests_support::LOCALE_TEST_LOCK;

    #[test]
    fn test_missing_table_mapping() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: RepositoryError = conn
            .query_row("SELECT NAME FROM Cable", [], |row| row.get::<_, String>(0))
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::MissingTable(_)));

        let _guard = LOCALE_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        crate::i18n::set_locale("en");
        let reason = err.localized();
        assert!(reason.starts_with("reference table missing: "));
        assert!(reason.contains("no such table"));
    }
}
