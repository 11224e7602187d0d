// ==========================================
// Syspro BOM 展开 - 核心库
// ==========================================
// 技术栈: Rust + rusqlite
// 系统定位: ERP 只读数据访问 + BOM 多级展开
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 查询执行与数据访问
pub mod repository;

// 引擎层 - BOM 展开与明细合并
pub mod engine;

// 配置层 - 连接串与运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能追踪
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigError, SysproConfig};
pub use domain::{
    BomEdge, CostRollup, DetailVariant, ExplodedNode, ExplosionResult, ExplosionRow,
    ExplosionWarning, InventoryDetail, TabularResult, Value,
};
pub use engine::{BomError, BomFinder, BomResult, ExplosionStrategy};
pub use repository::{QueryExecutor, RepositoryError, RepositoryResult, SysproExecutor};

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
