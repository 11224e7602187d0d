// ==========================================
// Syspro BOM 展开 - SQL 性能追踪
// ==========================================
// 职责: SQL 计数 + 慢查询日志 + 作用域耗时统计
// 依赖: rusqlite trace/profile 回调
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static PERF_DEPTH: Cell<u32> = Cell::new(0);
    static SQL_COUNT: Cell<u64> = Cell::new(0);
    static SLOW_SQL_COUNT: Cell<u64> = Cell::new(0);
}

pub const ENV_PERF_SQL: &str = "SYSPRO_BOM_PERF_SQL";
pub const ENV_SLOW_SQL_MS: &str = "SYSPRO_BOM_SLOW_SQL_MS";

pub(crate) fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn truncate_sql(sql: &str, max_len: usize) -> String {
    let s = sql.trim().replace('\n', " ");
    if s.chars().count() <= max_len {
        return s;
    }
    let mut out: String = s.chars().take(max_len).collect();
    out.push('…');
    out
}

// ==========================================
// PerfSettings - 追踪开关
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub slow_sql_ms: u64,
}

impl Default for PerfSettings {
    /// Debug 默认开启；Release 默认关闭
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            slow_sql_ms: if cfg!(debug_assertions) { 50 } else { 200 },
        }
    }
}

impl PerfSettings {
    /// 从任意键值来源读取
    ///
    /// - `SYSPRO_BOM_PERF_SQL=1` 强制开启
    /// - `SYSPRO_BOM_SLOW_SQL_MS=50` 慢 SQL 阈值（毫秒）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let enabled = lookup(ENV_PERF_SQL)
            .map(|v| is_true(&v))
            .unwrap_or(defaults.enabled);
        let slow_sql_ms = lookup(ENV_SLOW_SQL_MS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(defaults.slow_sql_ms);
        Self {
            enabled,
            slow_sql_ms,
        }
    }

    /// 从进程环境变量读取
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// 安装 SQLite 语句 trace/profile（用于 SQL 计数 + 慢查询日志）
pub fn install_sqlite_tracing(conn: &mut Connection, settings: &PerfSettings) {
    PERF_SQL_ENABLED.store(settings.enabled, Ordering::Relaxed);

    if !settings.enabled {
        // 显式清理，避免复用连接导致残留 callback
        conn.trace(None);
        conn.profile(None);
        return;
    }

    SLOW_SQL_THRESHOLD_MS.store(settings.slow_sql_ms, Ordering::Relaxed);
    conn.trace(Some(sql_trace_callback));
    conn.profile(Some(sql_profile_callback));
}

fn sql_trace_callback(_sql: &str) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if !active {
        return;
    }
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        let sql_short = truncate_sql(sql, 420);
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %sql_short,
            "slow sql"
        );
        let active = PERF_DEPTH.with(|d| d.get() > 0);
        if active {
            SLOW_SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
        }
    }
}

/// 性能统计 Guard：记录 elapsed_ms + SQL 语句数 + 慢 SQL 数
///
/// ```ignore
/// let _perf = syspro_bom::perf::PerfGuard::new("bom.explode");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
    slow_sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        let sql_start = SQL_COUNT.with(|c| c.get());
        let slow_sql_start = SLOW_SQL_COUNT.with(|c| c.get());
        Self {
            op,
            start: Instant::now(),
            sql_start,
            slow_sql_start,
        }
    }

    /// 本作用域内已执行的 SQL 语句数（追踪关闭时恒为 0）
    pub fn sql_count(&self) -> u64 {
        SQL_COUNT
            .with(|c| c.get())
            .saturating_sub(self.sql_start)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = self.sql_count();
        let slow_sql_count = SLOW_SQL_COUNT
            .with(|c| c.get())
            .saturating_sub(self.slow_sql_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            sql_count,
            slow_sql_count,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
