// ==========================================
// Syspro BOM 展开 - 明细合并
// ==========================================
// 职责: 展开节点 LEFT JOIN 库存明细 (component = StockCode)
// 红线: 一次批量查询（去重后的代码集合），禁止 N+1
// 红线: 不去重节点，同一子件多条路径各保留一行
// ==========================================

use crate::domain::bom::{DetailVariant, ExplodedNode, ExplosionRow, ExplosionWarning};
use crate::repository::error::RepositoryResult;
use crate::repository::executor::QueryExecutor;
use crate::repository::inventory_repo::InventoryRepository;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// 合并结果
#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub rows: Vec<ExplosionRow>,
    /// 每个缺失明细的代码一条（按代码升序）
    pub warnings: Vec<ExplosionWarning>,
}

pub struct DetailMerger {
    inventory: InventoryRepository,
}

impl DetailMerger {
    pub fn new(executor: Arc<dyn QueryExecutor>, variant: DetailVariant) -> Self {
        Self {
            inventory: InventoryRepository::new(executor, variant),
        }
    }

    pub fn variant(&self) -> DetailVariant {
        self.inventory.variant()
    }

    /// 合并库存明细
    ///
    /// 节点为空时不发起查询
    pub fn merge(&self, nodes: Vec<ExplodedNode>) -> RepositoryResult<MergeOutput> {
        if nodes.is_empty() {
            return Ok(MergeOutput::default());
        }

        let codes: Vec<String> = nodes
            .iter()
            .map(|n| n.component.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let details = self.inventory.fetch_details(&codes)?;

        let warnings: Vec<ExplosionWarning> = codes
            .iter()
            .filter(|code| !details.contains_key(*code))
            .map(|code| {
                warn!(stock_code = %code, "库存明细缺失，明细字段置空");
                ExplosionWarning::MissingDetail {
                    stock_code: code.clone(),
                }
            })
            .collect();

        let rows: Vec<ExplosionRow> = nodes
            .into_iter()
            .map(|node| {
                let detail = details.get(&node.component);
                ExplosionRow::from_node(node, detail)
            })
            .collect();

        debug!(
            rows = rows.len(),
            distinct_codes = codes.len(),
            missing = warnings.len(),
            "明细合并完成"
        );

        Ok(MergeOutput { rows, warnings })
    }
}
