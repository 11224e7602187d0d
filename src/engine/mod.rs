// ==========================================
// Syspro BOM 展开 - 引擎层
// ==========================================
// 职责: BOM 多级展开 + 库存明细合并
// 输入: 根件代码
// 输出: 展开结果（行 + 告警）
// ==========================================

pub mod error;
pub mod explosion;
pub mod finder;
pub mod merge;
pub mod recursive;

pub use error::{BomError, BomResult};
pub use explosion::{explode_nodes, EdgeSet, Explosion};
pub use finder::{BomFinder, ExplosionStrategy};
pub use merge::{DetailMerger, MergeOutput};
pub use recursive::RecursiveBomQuery;
