// ==========================================
// Syspro BOM 展开 - 库存主数据仓储
// ==========================================
// 对齐: InvMaster (StockCode, Description, MaterialCost, LabourCost,
//                  UnitCost, DateLastPurchase)
// 约束: 按代码集合批量查询，一次 IN (...)，禁止逐行查询
// ==========================================

use crate::domain::bom::{DetailVariant, InventoryDetail};
use crate::domain::table::{TabularResult, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::executor::QueryExecutor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 库存主数据表
pub const INV_MASTER_TABLE: &str = "InvMaster";

const BASIC_DETAIL_SELECT: &str = "SELECT StockCode, Description, MaterialCost, LabourCost \
     FROM InvMaster";

const EXTENDED_DETAIL_SELECT: &str = "SELECT StockCode, Description, MaterialCost, LabourCost, \
     UnitCost, DateLastPurchase AS LastPurchaseDate FROM InvMaster";

/// 明细查询的 SELECT 部分
pub fn detail_select(variant: DetailVariant) -> &'static str {
    match variant {
        DetailVariant::Basic => BASIC_DETAIL_SELECT,
        DetailVariant::Extended => EXTENDED_DETAIL_SELECT,
    }
}

/// 拼接批量明细 SQL: `... WHERE TRIM(StockCode) IN (?,?,...)`
pub fn batch_detail_sql(variant: DetailVariant, code_count: usize) -> String {
    let placeholders = vec!["?"; code_count].join(",");
    format!(
        "{} WHERE TRIM(StockCode) IN ({})",
        detail_select(variant),
        placeholders
    )
}

// ==========================================
// InventoryRepository
// ==========================================
pub struct InventoryRepository {
    executor: Arc<dyn QueryExecutor>,
    variant: DetailVariant,
}

impl InventoryRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>, variant: DetailVariant) -> Self {
        Self { executor, variant }
    }

    pub fn variant(&self) -> DetailVariant {
        self.variant
    }

    /// 批量读取库存明细
    ///
    /// # 参数
    /// - codes: 去重后的库存代码
    ///
    /// # 返回
    /// - Ok(HashMap): stock_code -> 明细；codes 为空时不发起查询
    pub fn fetch_details(&self, codes: &[String]) -> RepositoryResult<HashMap<String, InventoryDetail>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = batch_detail_sql(self.variant, codes.len());
        let params: Vec<Value> = codes.iter().map(Value::from).collect();
        let table = self.executor.execute_table(&sql, &params)?;
        let details = details_from_table(&table, self.variant)?;

        debug!(
            requested = codes.len(),
            found = details.len(),
            variant = %self.variant,
            "库存明细已加载"
        );
        Ok(details)
    }
}

fn column(table: &TabularResult, name: &str) -> RepositoryResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: name.to_string(),
            message: "结果集中缺少该列".to_string(),
        })
}

fn optional_number(value: &Value, field: &str) -> RepositoryResult<Option<f64>> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("期望数值，实际 {}", value),
        })
}

/// 表格 -> (stock_code -> 明细)
///
/// 同一代码出现多次时保留第一条
pub fn details_from_table(
    table: &TabularResult,
    variant: DetailVariant,
) -> RepositoryResult<HashMap<String, InventoryDetail>> {
    let code_idx = column(table, "StockCode")?;
    let desc_idx = column(table, "Description")?;
    let material_idx = column(table, "MaterialCost")?;
    let labour_idx = column(table, "LabourCost")?;
    let extended_idx = match variant {
        DetailVariant::Basic => None,
        DetailVariant::Extended => Some((
            column(table, "UnitCost")?,
            column(table, "LastPurchaseDate")?,
        )),
    };

    let mut details = HashMap::with_capacity(table.len());
    for row in &table.rows {
        let Some(stock_code) = row[code_idx].to_trimmed_string() else {
            continue;
        };
        if details.contains_key(&stock_code) {
            continue;
        }

        let (unit_cost, last_purchase_date) = match extended_idx {
            Some((unit_idx, date_idx)) => (
                optional_number(&row[unit_idx], "UnitCost")?,
                row[date_idx].as_date(),
            ),
            None => (None, None),
        };

        let detail = InventoryDetail {
            stock_code: stock_code.clone(),
            description: row[desc_idx].to_trimmed_string(),
            material_cost: optional_number(&row[material_idx], "MaterialCost")?,
            labour_cost: optional_number(&row[labour_idx], "LabourCost")?,
            unit_cost,
            last_purchase_date,
        };
        details.insert(stock_code, detail);
    }
    Ok(details)
}
