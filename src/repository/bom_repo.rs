// ==========================================
// Syspro BOM 展开 - BOM 结构仓储
// ==========================================
// 对齐: BomStructure (ParentPart, Component, QtyPer)
// 红线: Repository 不含展开逻辑，只负责取数与类型校验
// ==========================================

use crate::domain::bom::BomEdge;
use crate::domain::table::{TabularResult, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::executor::QueryExecutor;
use std::sync::Arc;
use tracing::{debug, warn};

/// BOM 结构表
pub const BOM_STRUCTURE_TABLE: &str = "BomStructure";

/// 全量 BOM 结构查询
pub const BOM_STRUCTURE_QUERY: &str =
    "SELECT ParentPart, Component, QtyPer FROM BomStructure";

// ==========================================
// BomStructureRepository
// ==========================================
pub struct BomStructureRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl BomStructureRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    /// 一次性读取全部 BOM 边
    ///
    /// # 返回
    /// - Ok(Vec<BomEdge>): 保持数据库返回顺序
    /// - Err(InvalidQuantity): QtyPer 非数值
    pub fn load_all_edges(&self) -> RepositoryResult<Vec<BomEdge>> {
        let table = self.executor.execute_table(BOM_STRUCTURE_QUERY, &[])?;
        let edges = edges_from_table(&table)?;
        debug!(rows = table.len(), edges = edges.len(), "BOM 结构已加载");
        Ok(edges)
    }

    /// 拥有 BOM 的父件数量
    pub fn count_parents(&self) -> RepositoryResult<i64> {
        let value = self.executor.execute_scalar(
            "SELECT COUNT(DISTINCT TRIM(ParentPart)) FROM BomStructure",
            &[],
        )?;
        match value {
            Value::Integer(n) => Ok(n),
            other => Err(RepositoryError::FieldValueError {
                field: "COUNT(ParentPart)".to_string(),
                message: format!("期望整数，实际 {}", other),
            }),
        }
    }
}

fn required_column(table: &TabularResult, name: &str) -> RepositoryResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: name.to_string(),
            message: "结果集中缺少该列".to_string(),
        })
}

/// 表格 -> BomEdge 列表
///
/// 父件或子件代码为空的行跳过（记 warn），用量非数值直接报错
pub fn edges_from_table(table: &TabularResult) -> RepositoryResult<Vec<BomEdge>> {
    let parent_idx = required_column(table, "ParentPart")?;
    let component_idx = required_column(table, "Component")?;
    let qty_idx = required_column(table, "QtyPer")?;

    let mut edges = Vec::with_capacity(table.len());
    for (row_no, row) in table.rows.iter().enumerate() {
        let parent = row[parent_idx].to_trimmed_string().unwrap_or_default();
        let component = row[component_idx].to_trimmed_string().unwrap_or_default();
        if parent.is_empty() || component.is_empty() {
            warn!(row = row_no, "BOM 行缺少父件或子件代码，已跳过");
            continue;
        }

        let qty_per = row[qty_idx]
            .as_f64()
            .ok_or_else(|| RepositoryError::InvalidQuantity {
                parent: parent.clone(),
                component: component.clone(),
                value: row[qty_idx].to_string(),
            })?;

        edges.push(BomEdge {
            parent_part: parent,
            component,
            qty_per,
        });
    }
    Ok(edges)
}
