// ==========================================
// Syspro BOM 展开 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 查询失败直接上抛，不做重试
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("数据库缺少表: {table}")]
    MissingTable { table: String },

    // ===== 结果形态错误 =====
    #[error("标量查询应返回 1 行，实际返回 {rows} 行")]
    ScalarCardinality { rows: usize },

    // ===== 数据质量错误 =====
    #[error("BOM 用量非数值 (parent={parent}, component={component}): {value}")]
    InvalidQuantity {
        parent: String,
        component: String,
        value: String,
    },

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let detail = msg.unwrap_or_else(|| code.to_string());
                match code.code {
                    rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::NotADatabase
                    | rusqlite::ErrorCode::PermissionDenied => {
                        RepositoryError::DatabaseConnectionError(detail)
                    }
                    _ => RepositoryError::DatabaseQueryError(detail),
                }
            }
            rusqlite::Error::InvalidColumnType(idx, name, ty) => RepositoryError::FieldValueError {
                field: name,
                message: format!("列 {} 类型不匹配: {}", idx, ty),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
