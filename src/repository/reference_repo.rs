// ==========================================
// 光纤路由分析 - 参考库仓储
// ==========================================
// 表: Cable / SpliceCases（由外部流程维护, 本模块只读）
// 约束: 名称比较不区分大小写, 只取第一条
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::{open_sqlite_connection, table_exists};
use crate::domain::reference::{CableReference, SpliceCaseReference};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

// ==========================================
// ReferenceLookup Trait
// ==========================================
// 实现者: SqliteReferenceRepository, NoReferenceLookup
pub trait ReferenceLookup: Send + Sync {
    /// 是否接入了参考库（未接入时不生成接头盒建议）
    fn is_available(&self) -> bool {
        true
    }

    /// 按光缆名查询（不区分大小写）
    fn find_cable(&self, name: &str) -> RepositoryResult<Option<CableReference>>;

    /// 按接头盒名查询（不区分大小写）
    fn find_splice_case(&self, name: &str) -> RepositoryResult<Option<SpliceCaseReference>>;

    /// 光缆名 → segment id（空串视为缺失）
    fn lookup_segment_id(&self, cable_name: &str) -> RepositoryResult<Option<String>> {
        Ok(self
            .find_cable(cable_name)?
            .and_then(|cable| cable.segment_id().map(str::to_string)))
    }
}

// ==========================================
// NoReferenceLookup - 未配置参考库
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferenceLookup;

impl ReferenceLookup for NoReferenceLookup {
    fn is_available(&self) -> bool {
        false
    }

    fn find_cable(&self, _name: &str) -> RepositoryResult<Option<CableReference>> {
        Ok(None)
    }

    fn find_splice_case(&self, _name: &str) -> RepositoryResult<Option<SpliceCaseReference>> {
        Ok(None)
    }
}

// ==========================================
// SqliteReferenceRepository
// ==========================================
pub struct SqliteReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReferenceRepository {
    /// 打开参考库
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl ReferenceLookup for SqliteReferenceRepository {
    /// 库中存在 Cable 表才视为可用
    fn is_available(&self) -> bool {
        let available = self
            .get_conn()
            .and_then(|conn| Ok(table_exists(&conn, "Cable")?))
            .unwrap_or_else(|err| {
                warn!(error = %err, "检查参考表失败");
                false
            });
        if !available {
            debug!("参考库缺少 Cable 表");
        }
        available
    }

    fn find_cable(&self, name: &str) -> RepositoryResult<Option<CableReference>> {
        let conn = self.get_conn()?;
        let cable = conn
            .query_row(
                r#"
                SELECT NAME, CABLE_STATUS, OWNER, IOF, CONSTRUCT_TYPE, SEGMENT_ID
                FROM Cable
                WHERE UPPER(NAME) = UPPER(?1)
                LIMIT 1
                "#,
                params![name.trim()],
                |row| {
                    Ok(CableReference {
                        name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        cable_status: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        owner: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        iof: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        construct_type: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        segment_id: text_of(row.get_ref(5)?),
                    })
                },
            )
            .optional()?;

        debug!(name, found = cable.is_some(), "查询光缆参考");
        Ok(cable)
    }

    fn find_splice_case(&self, name: &str) -> RepositoryResult<Option<SpliceCaseReference>> {
        let conn = self.get_conn()?;
        let splice = conn
            .query_row(
                r#"
                SELECT NAME, BUTTSPLICE, RESTRICTED, RS_CODE, RS_COMMENTS, MANHOLE
                FROM SpliceCases
                WHERE UPPER(NAME) = UPPER(?1)
                LIMIT 1
                "#,
                params![name.trim()],
                |row| {
                    Ok(SpliceCaseReference {
                        name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        butt_splice: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        restricted: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        rs_code: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        rs_comments: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        manhole: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;

        debug!(name, found = splice.is_some(), "查询接头盒参考");
        Ok(splice)
    }
}

/// SEGMENT_ID 在外部库中可能存为整数或文本
fn text_of(value: rusqlite::types::ValueRef<'_>) -> String {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format!("{}", f),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteReferenceRepository {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE Cable (NAME TEXT, CABLE_STATUS TEXT, OWNER TEXT, IOF TEXT, CONSTRUCT_TYPE TEXT, SEGMENT_ID);
            CREATE TABLE SpliceCases (NAME TEXT, BUTTSPLICE TEXT, RESTRICTED TEXT, RS_CODE TEXT, RS_COMMENTS TEXT, MANHOLE TEXT);
            INSERT INTO Cable VALUES ('33UABLS001', 'IS', 'OPTUS', 'N', 'BU', 1001);
            INSERT INTO Cable VALUES ('NOSEG', 'IS', NULL, NULL, NULL, '');
            INSERT INTO SpliceCases VALUES ('45BJL-Z', 'N', 'Y', 'RS-NO', NULL, 'CP_1');
            "#,
        )
        .unwrap();
        SqliteReferenceRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_find_cable_case_insensitive() {
        let repo = setup();
        let cable = repo.find_cable("33uabls001").unwrap().unwrap();
        assert_eq!(cable.owner, "OPTUS");
        assert_eq!(cable.segment_id, "1001");
        assert_eq!(repo.lookup_segment_id(" 33UABLS001 ").unwrap().as_deref(), Some("1001"));
    }

    #[test]
    fn test_blank_segment_is_miss() {
        let repo = setup();
        assert!(repo.find_cable("NOSEG").unwrap().is_some());
        assert_eq!(repo.lookup_segment_id("NOSEG").unwrap(), None);
        assert_eq!(repo.lookup_segment_id("UNKNOWN").unwrap(), None);
    }

    #[test]
    fn test_find_splice_case() {
        let repo = setup();
        let case = repo.find_splice_case("45bjl-z").unwrap().unwrap();
        assert_eq!(case.rs_code, "RS-NO");
        assert_eq!(case.rs_comments, "");
        assert!(repo.find_splice_case("nope").unwrap().is_none());
    }

    #[test]
    fn test_missing_table_is_error() {
        let conn = Connection::open_in_memory().unwrap();
        let repo = SqliteReferenceRepository::from_connection(Arc::new(Mutex::new(conn)));
        let err = repo.find_cable("X").unwrap_err();
        assert!(matches!(err, RepositoryError::MissingTable(_)));
    }

    #[test]
    fn test_available_only_with_cable_table() {
        assert!(setup().is_available());

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE config_kv (scope_id TEXT, key TEXT, value TEXT);")
            .unwrap();
        let repo = SqliteReferenceRepository::from_connection(Arc::new(Mutex::new(conn)));
        assert!(!repo.is_available());
    }

    #[test]
    fn test_no_reference_lookup() {
        assert!(!NoReferenceLookup.is_available());
        assert_eq!(NoReferenceLookup.lookup_segment_id("X").unwrap(), None);
    }
}
