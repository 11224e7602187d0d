// ==========================================
// Syspro BOM 展开 - 服务端递归查询
// ==========================================
// 一条 WITH RECURSIVE 完成: 传递闭包 + 用量连乘 + 路径防环 + LEFT JOIN 明细
// 不在内存中保留 BOM 边集
// ==========================================
// 路径列 path 以 char(31) 分隔（代码中可能含 '/'），记录当前行子件的全部祖先；
// 子件已在 path 中的行标记 is_cycle = 1，且不再向下递归
// 用量按 根 -> 子件 顺序连乘；每行另带本边原始 QtyPer 供校验
// ==========================================

use crate::domain::bom::{DetailVariant, ExplosionResult, ExplosionRow, ExplosionWarning};
use crate::domain::table::{TabularResult, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::executor::QueryExecutor;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

const EXPLOSION_CTE: &str = r#"
WITH RECURSIVE bom(parent_part, component, qty, edge_qty, level, path, is_cycle) AS (
    SELECT
        TRIM(b.ParentPart),
        TRIM(b.Component),
        b.QtyPer,
        b.QtyPer,
        1,
        char(31) || TRIM(b.ParentPart) || char(31),
        CASE WHEN TRIM(b.Component) = TRIM(b.ParentPart) THEN 1 ELSE 0 END
    FROM BomStructure b
    WHERE TRIM(b.ParentPart) = ?1
    UNION ALL
    SELECT
        TRIM(b.ParentPart),
        TRIM(b.Component),
        bom.qty * b.QtyPer,
        b.QtyPer,
        bom.level + 1,
        bom.path || bom.component || char(31),
        CASE
            WHEN instr(bom.path || bom.component || char(31), char(31) || TRIM(b.Component) || char(31)) > 0
            THEN 1 ELSE 0
        END
    FROM BomStructure b
    JOIN bom ON TRIM(b.ParentPart) = bom.component
    WHERE bom.is_cycle = 0
)
"#;

/// 路径列分隔符，与 CTE 中的 char(31) 一致
const PATH_SEPARATOR: char = '\u{1f}';

const BASIC_COLUMNS: &str = "inv.StockCode, inv.Description, inv.MaterialCost, inv.LabourCost";

const EXTENDED_COLUMNS: &str = "inv.StockCode, inv.Description, inv.MaterialCost, inv.LabourCost, \
     inv.UnitCost, inv.DateLastPurchase AS LastPurchaseDate";

/// 完整的服务端展开 SQL
///
/// 排序与内存策略一致: MaterialCost 降序（空值最后）→ 层级 → 子件 → 父件 → 用量降序
pub fn explosion_sql(variant: DetailVariant) -> String {
    let detail_columns = match variant {
        DetailVariant::Basic => BASIC_COLUMNS,
        DetailVariant::Extended => EXTENDED_COLUMNS,
    };
    format!(
        "{cte}SELECT
    bom.component AS Component,
    bom.parent_part AS ParentPart,
    bom.level AS Level,
    bom.qty AS CumulativeQty,
    bom.edge_qty AS QtyPer,
    bom.path AS Path,
    bom.is_cycle AS IsCycle,
    {detail_columns}
FROM bom
LEFT JOIN InvMaster inv ON TRIM(inv.StockCode) = bom.component
ORDER BY
    inv.MaterialCost IS NULL,
    inv.MaterialCost DESC,
    bom.level,
    bom.component,
    bom.parent_part,
    bom.qty DESC",
        cte = EXPLOSION_CTE,
        detail_columns = detail_columns,
    )
}

// ==========================================
// RecursiveBomQuery
// ==========================================
pub struct RecursiveBomQuery {
    executor: Arc<dyn QueryExecutor>,
    variant: DetailVariant,
}

impl RecursiveBomQuery {
    pub fn new(executor: Arc<dyn QueryExecutor>, variant: DetailVariant) -> Self {
        Self { executor, variant }
    }

    pub fn variant(&self) -> DetailVariant {
        self.variant
    }

    /// 执行服务端展开
    pub fn explode(&self, root: &str) -> RepositoryResult<ExplosionResult> {
        let sql = explosion_sql(self.variant);
        let table = self.executor.execute_table(&sql, &[Value::from(root)])?;
        let result = result_from_table(root, &table, self.variant)?;

        debug!(
            root = %root,
            rows = result.rows.len(),
            warnings = result.warnings.len(),
            "服务端展开完成"
        );
        Ok(result)
    }
}

struct Columns {
    component: usize,
    parent: usize,
    level: usize,
    qty: usize,
    edge_qty: usize,
    path: usize,
    is_cycle: usize,
    stock_code: usize,
    description: usize,
    material_cost: usize,
    labour_cost: usize,
    extended: Option<(usize, usize)>,
}

impl Columns {
    fn resolve(table: &TabularResult, variant: DetailVariant) -> RepositoryResult<Self> {
        let col = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| RepositoryError::FieldValueError {
                    field: name.to_string(),
                    message: "结果集中缺少该列".to_string(),
                })
        };
        Ok(Self {
            component: col("Component")?,
            parent: col("ParentPart")?,
            level: col("Level")?,
            qty: col("CumulativeQty")?,
            edge_qty: col("QtyPer")?,
            path: col("Path")?,
            is_cycle: col("IsCycle")?,
            stock_code: col("StockCode")?,
            description: col("Description")?,
            material_cost: col("MaterialCost")?,
            labour_cost: col("LabourCost")?,
            extended: match variant {
                DetailVariant::Basic => None,
                DetailVariant::Extended => Some((col("UnitCost")?, col("LastPurchaseDate")?)),
            },
        })
    }
}

fn split_path(path: &Value) -> Vec<String> {
    path.as_str()
        .unwrap_or_default()
        .split(PATH_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 递归查询结果 -> ExplosionResult
fn result_from_table(
    root: &str,
    table: &TabularResult,
    variant: DetailVariant,
) -> RepositoryResult<ExplosionResult> {
    let mut result = ExplosionResult::empty(root);
    if table.is_empty() {
        return Ok(result);
    }

    let cols = Columns::resolve(table, variant)?;
    let mut missing: BTreeSet<String> = BTreeSet::new();

    for row in &table.rows {
        let component = row[cols.component].to_trimmed_string().unwrap_or_default();
        let parent_part = row[cols.parent].to_trimmed_string().unwrap_or_default();

        // 逐边校验原始用量（SQLite 乘法会把非数值静默当作 0）
        if row[cols.edge_qty].as_f64().is_none() {
            return Err(RepositoryError::InvalidQuantity {
                parent: parent_part,
                component,
                value: row[cols.edge_qty].to_string(),
            });
        }

        if row[cols.is_cycle].as_f64().unwrap_or(0.0) != 0.0 {
            result.warnings.push(ExplosionWarning::CycleDetected {
                path: split_path(&row[cols.path]),
                parent_part,
                component,
            });
            continue;
        }

        let cumulative_qty =
            row[cols.qty]
                .as_f64()
                .ok_or_else(|| RepositoryError::InvalidQuantity {
                    parent: parent_part.clone(),
                    component: component.clone(),
                    value: row[cols.qty].to_string(),
                })?;
        let level = row[cols.level].as_f64().unwrap_or(0.0) as u32;

        let has_detail = !row[cols.stock_code].is_null();
        if !has_detail {
            missing.insert(component.clone());
        }

        let (unit_cost, last_purchase_date) = match (has_detail, cols.extended) {
            (true, Some((unit_idx, date_idx))) => {
                (row[unit_idx].as_f64(), row[date_idx].as_date())
            }
            _ => (None, None),
        };

        result.rows.push(ExplosionRow {
            component,
            parent_part,
            level,
            cumulative_qty,
            description: row[cols.description].to_trimmed_string(),
            material_cost: row[cols.material_cost].as_f64(),
            labour_cost: row[cols.labour_cost].as_f64(),
            unit_cost,
            last_purchase_date,
        });
    }

    result
        .warnings
        .extend(missing.into_iter().map(|stock_code| ExplosionWarning::MissingDetail { stock_code }));
    Ok(result)
}
