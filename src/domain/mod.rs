// ==========================================
// Syspro BOM 展开 - 领域层
// ==========================================
// 职责: 实体与值类型定义，不含数据访问
// ==========================================

pub mod bom;
pub mod table;

pub use bom::{
    BomEdge, CostRollup, DetailVariant, ExplodedNode, ExplosionResult, ExplosionRow,
    ExplosionWarning, InventoryDetail,
};
pub use table::{TabularResult, Value};
