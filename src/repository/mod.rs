// ==========================================
// Syspro BOM 展开 - 数据仓储层
// ==========================================
// 红线: Repository 不含展开逻辑
// 职责: 提供只读数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod bom_repo;
pub mod error;
pub mod executor;
pub mod inventory_repo;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心仓储
pub use bom_repo::{BomStructureRepository, BOM_STRUCTURE_QUERY, BOM_STRUCTURE_TABLE};
pub use error::{RepositoryError, RepositoryResult};
pub use executor::{QueryExecutor, RowVisitor, SysproExecutor};
pub use inventory_repo::{InventoryRepository, INV_MASTER_TABLE};
