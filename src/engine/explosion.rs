// ==========================================
// Syspro BOM 展开 - 内存展开引擎
// ==========================================
// 输入: 构造时一次性加载的 BomStructure 全表
// 输出: (子件, 累计用量, 层级/直接父件) 扁平列表 + 循环告警
// ==========================================

mod core;
mod edge_set;


pub use self::core::{explode_nodes, Explosion};
pub use edge_set::{ChildEdge, EdgeSet};
