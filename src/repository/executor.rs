// ==========================================
// Syspro BOM 展开 - 查询执行器
// ==========================================
// 职责: 执行参数化只读 SQL，返回 表格 / 标量 / 逐行游标
// 约束: 参数绑定统一使用位置参数 (?, ?N)
// 约束: 每个执行器实例持有一个长连接，构造时打开
// ==========================================

use crate::config::SysproConfig;
use crate::db::{configure_connection, open_connection, table_exists};
use crate::domain::table::{TabularResult, Value};
use crate::perf::{install_sqlite_tracing, PerfSettings};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// 逐行访问回调
pub type RowVisitor<'a> = dyn FnMut(&[Value]) -> RepositoryResult<()> + 'a;

// ==========================================
// QueryExecutor Trait
// ==========================================
// 实现者: SysproExecutor（rusqlite）；测试中可替换为内存实现
pub trait QueryExecutor: Send + Sync {
    /// 执行查询并返回原始表格（不做字符串清洗）
    fn execute_table_raw(&self, sql: &str, params: &[Value]) -> RepositoryResult<TabularResult>;

    /// 执行查询并返回表格，文本列去除首尾空白
    fn execute_table(&self, sql: &str, params: &[Value]) -> RepositoryResult<TabularResult> {
        Ok(self.execute_table_raw(sql, params)?.stripped())
    }

    /// 执行标量查询
    ///
    /// # 返回
    /// - Ok(Value): 唯一一行的第一列（可能为 Value::Null）
    /// - Err(ScalarCardinality): 0 行或多于 1 行
    fn execute_scalar(&self, sql: &str, params: &[Value]) -> RepositoryResult<Value> {
        let table = self.execute_table(sql, params)?;
        if table.len() != 1 {
            return Err(RepositoryError::ScalarCardinality { rows: table.len() });
        }
        table
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or_else(|| RepositoryError::DatabaseQueryError("标量查询没有返回列".to_string()))
    }

    /// 逐行执行查询（游标形态），返回访问的行数
    fn execute_rows(
        &self,
        sql: &str,
        params: &[Value],
        visitor: &mut RowVisitor<'_>,
    ) -> RepositoryResult<usize> {
        let table = self.execute_table_raw(sql, params)?;
        for row in &table.rows {
            visitor(row.as_slice())?;
        }
        Ok(table.len())
    }
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for Arc<T> {
    fn execute_table_raw(&self, sql: &str, params: &[Value]) -> RepositoryResult<TabularResult> {
        (**self).execute_table_raw(sql, params)
    }

    fn execute_table(&self, sql: &str, params: &[Value]) -> RepositoryResult<TabularResult> {
        (**self).execute_table(sql, params)
    }

    fn execute_scalar(&self, sql: &str, params: &[Value]) -> RepositoryResult<Value> {
        (**self).execute_scalar(sql, params)
    }

    fn execute_rows(
        &self,
        sql: &str,
        params: &[Value],
        visitor: &mut RowVisitor<'_>,
    ) -> RepositoryResult<usize> {
        (**self).execute_rows(sql, params, visitor)
    }
}

// ==========================================
// SysproExecutor - rusqlite 执行器
// ==========================================
pub struct SysproExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SysproExecutor {
    /// 按配置打开连接（只读 + SQL 性能追踪）
    pub fn new(config: &SysproConfig) -> RepositoryResult<Self> {
        let mut conn = open_connection(&config.connection_string)?;
        install_sqlite_tracing(&mut conn, &config.perf);
        debug!("Syspro 连接已建立");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 按连接串直接打开（使用默认性能追踪设置）
    pub fn open(connection_string: &str) -> RepositoryResult<Self> {
        let mut conn = open_connection(connection_string)?;
        install_sqlite_tracing(&mut conn, &PerfSettings::from_env());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建执行器
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（含 query_only，之后该连接不可写）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 校验所需的表（或视图）均存在
    ///
    /// # 返回
    /// - Err(MissingTable): 第一个缺失的表
    pub fn ensure_tables(&self, tables: &[&str]) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        for table in tables {
            if !table_exists(&conn, table)? {
                return Err(RepositoryError::MissingTable {
                    table: table.to_string(),
                });
            }
        }
        Ok(())
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

fn sql_preview(sql: &str) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= 160 {
        return s;
    }
    let mut out: String = s.chars().take(160).collect();
    out.push('…');
    out
}

impl QueryExecutor for SysproExecutor {
    fn execute_table_raw(&self, sql: &str, params: &[Value]) -> RepositoryResult<TabularResult> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut table = TabularResult::new(columns);
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(Value::from(row.get_ref(idx)?));
            }
            table.rows.push(cells);
        }

        debug!(
            sql = %sql_preview(sql),
            params = params.len(),
            rows = table.len(),
            "查询完成"
        );
        Ok(table)
    }

    fn execute_scalar(&self, sql: &str, params: &[Value]) -> RepositoryResult<Value> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let first = match rows.next()? {
            Some(row) => Value::from(row.get_ref(0)?),
            None => return Err(RepositoryError::ScalarCardinality { rows: 0 }),
        };

        let mut count = 1usize;
        while rows.next()?.is_some() {
            count += 1;
        }
        if count != 1 {
            return Err(RepositoryError::ScalarCardinality { rows: count });
        }

        Ok(match first {
            Value::Text(s) => Value::Text(s.trim().to_string()),
            other => other,
        })
    }

    fn execute_rows(
        &self,
        sql: &str,
        params: &[Value],
        visitor: &mut RowVisitor<'_>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut visited = 0usize;
        let mut cells = Vec::with_capacity(column_count);
        while let Some(row) = rows.next()? {
            cells.clear();
            for idx in 0..column_count {
                cells.push(Value::from(row.get_ref(idx)?));
            }
            visitor(cells.as_slice())?;
            visited += 1;
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_executor() -> SysproExecutor {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE InvMaster (
                StockCode TEXT PRIMARY KEY,
                Description TEXT,
                MaterialCost REAL
            );
            INSERT INTO InvMaster VALUES ('C1   ', '  Bolt  ', 1.25);
            INSERT INTO InvMaster VALUES ('C2   ', 'Nut', 0.5);
            "#,
        )
        .unwrap();
        SysproExecutor::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_execute_table_strips_text() {
        let exec = create_executor();
        let table = exec
            .execute_table(
                "SELECT StockCode, Description, MaterialCost FROM InvMaster WHERE StockCode = ?1",
                &[Value::from("C1   ")],
            )
            .unwrap();

        assert_eq!(table.columns, vec!["StockCode", "Description", "MaterialCost"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], Value::from("C1"));
        assert_eq!(table.rows[0][1], Value::from("Bolt"));
        assert_eq!(table.rows[0][2], Value::Real(1.25));
    }

    #[test]
    fn test_execute_table_raw_keeps_padding() {
        let exec = create_executor();
        let table = exec
            .execute_table_raw("SELECT StockCode FROM InvMaster ORDER BY StockCode", &[])
            .unwrap();
        assert_eq!(table.rows[0][0], Value::from("C1   "));
    }

    #[test]
    fn test_scalar_single_row() {
        let exec = create_executor();
        let v = exec
            .execute_scalar("SELECT COUNT(*) FROM InvMaster", &[])
            .unwrap();
        assert_eq!(v, Value::Integer(2));

        let v = exec
            .execute_scalar(
                "SELECT Description FROM InvMaster WHERE StockCode = ?",
                &[Value::from("C1   ")],
            )
            .unwrap();
        assert_eq!(v, Value::from("Bolt"));
    }

    #[test]
    fn test_scalar_null_value_is_allowed() {
        let exec = create_executor();
        let v = exec.execute_scalar("SELECT NULL", &[]).unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_scalar_cardinality_errors() {
        let exec = create_executor();

        let err = exec
            .execute_scalar("SELECT StockCode FROM InvMaster", &[])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ScalarCardinality { rows: 2 }));

        let err = exec
            .execute_scalar(
                "SELECT StockCode FROM InvMaster WHERE StockCode = ?",
                &[Value::from("NOPE")],
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ScalarCardinality { rows: 0 }));
    }

    #[test]
    fn test_execute_rows_visits_each_row() {
        let exec = create_executor();
        let mut codes = Vec::new();
        let n = exec
            .execute_rows(
                "SELECT StockCode FROM InvMaster ORDER BY StockCode",
                &[],
                &mut |row| {
                    codes.push(row[0].to_trimmed_string().unwrap_or_default());
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(codes, vec!["C1", "C2"]);
    }

    #[test]
    fn test_ensure_tables_reports_missing_table() {
        let exec = create_executor();
        assert!(exec.ensure_tables(&["InvMaster"]).is_ok());

        let err = exec
            .ensure_tables(&["InvMaster", "BomStructure"])
            .unwrap_err();
        match err {
            RepositoryError::MissingTable { table } => assert_eq!(table, "BomStructure"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_sql_is_query_error() {
        let exec = create_executor();
        let err = exec.execute_table("SELEC nonsense", &[]).unwrap_err();
        assert!(matches!(err, RepositoryError::DatabaseQueryError(_)));
    }

    #[test]
    fn test_connection_is_read_only() {
        let exec = create_executor();
        let err = exec
            .execute_table("DELETE FROM InvMaster", &[])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DatabaseQueryError(_)));
    }
}
