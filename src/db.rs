// ==========================================
// Syspro BOM 展开 - 数据库连接初始化
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为（只读 + busy_timeout）
// - 连接串支持文件路径与 `file:` URI 两种写法
// ==========================================

use rusqlite::{params, Connection, OpenFlags};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置连接的统一 PRAGMA
///
/// 说明：
/// - query_only 需要"每个连接"单独开启，开启后任何写语句返回 SQLITE_READONLY
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA query_only = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开连接并应用统一配置
///
/// # 参数
/// - connection_string: 数据库文件路径，或 `file:...?mode=ro` 形式的 URI
pub fn open_connection(connection_string: &str) -> rusqlite::Result<Connection> {
    let target = connection_string.trim();
    let mut flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if target.starts_with("file:") {
        flags |= OpenFlags::SQLITE_OPEN_URI;
    }

    let conn = Connection::open_with_flags(target, flags)?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// 判断某张表是否存在
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
